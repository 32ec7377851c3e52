//! Live memo repository for the current session.
//!
//! # Responsibility
//! - Keep a cached, live view of every memo owned by the current session.
//! - Derive group names/colors for the entry screen's group picker.
//! - Mediate saves, including the append-to-existing-group path.
//!
//! # Invariants
//! - The cache only ever holds snapshots of the current subscription
//!   generation; late deliveries from an older owner are dropped.
//! - A snapshot never replaces a newer one (versions only grow).
//! - At most one save runs at a time; overlapping calls are dropped, not
//!   queued.
//! - Empty trimmed text never reaches the store.

use crate::error::{MemoError, MemoResult, PreconditionError};
use crate::model::memo::{
    normalize_color, normalize_group_name, normalize_text, Memo, MemoId, NewMemo, SessionId,
};
use crate::projection::grouping::{distinct_group_names, first_group_colors};
use crate::store::{ConditionalWrite, MemoSnapshot, RemoteStore, Subscription};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Compare-and-set attempts for one append before giving up.
const MAX_APPEND_ATTEMPTS: usize = 3;

/// Group entry offered by the group picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOption {
    pub name: String,
    pub color: Option<String>,
}

/// Result of a save request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Created(MemoId),
    /// Text was appended to an existing memo of the same group.
    Appended(MemoId),
    /// Another save was in flight; nothing was written.
    Skipped,
}

#[derive(Debug, Default)]
struct CacheState {
    owner: Option<SessionId>,
    generation: u64,
    version: Option<u64>,
    memos: Vec<Memo>,
}

impl CacheState {
    fn apply(&mut self, generation: u64, snapshot: MemoSnapshot) -> bool {
        if generation != self.generation || self.owner.as_ref() != Some(&snapshot.owner) {
            return false;
        }
        if self.version.is_some_and(|current| current >= snapshot.version) {
            return false;
        }
        self.version = Some(snapshot.version);
        self.memos = snapshot.memos;
        true
    }
}

/// Resets the single-flight flag when the save finishes, even on error.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn try_begin(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Live repository over a [`RemoteStore`].
pub struct MemoRepository<S: RemoteStore> {
    store: Arc<S>,
    cache: Arc<Mutex<CacheState>>,
    subscription: Mutex<Option<Subscription>>,
    saving: AtomicBool,
    default_color: String,
}

impl<S: RemoteStore> MemoRepository<S> {
    /// Creates an unsubscribed repository. `default_color` is written on new
    /// memos whose group has no known color.
    pub fn new(store: Arc<S>, default_color: impl Into<String>) -> Self {
        Self {
            store,
            cache: Arc::new(Mutex::new(CacheState::default())),
            subscription: Mutex::new(None),
            saving: AtomicBool::new(false),
            default_color: default_color.into(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn cache(&self) -> MutexGuard<'_, CacheState> {
        lock_cache(&self.cache)
    }

    fn subscription_slot(&self) -> MutexGuard<'_, Option<Subscription>> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the live query for `owner`, replacing any previous one.
    ///
    /// The cache is cleared first, so data of a previous owner is never
    /// visible after this returns.
    pub fn subscribe(&self, owner: SessionId) -> MemoResult<()> {
        let mut slot = self.subscription_slot();
        if let Some(previous) = slot.take() {
            previous.cancel();
        }

        let generation = {
            let mut cache = self.cache();
            cache.generation += 1;
            cache.owner = Some(owner.clone());
            cache.version = None;
            cache.memos.clear();
            cache.generation
        };

        let cache = Arc::downgrade(&self.cache);
        let subscription = self.store.subscribe(
            &owner,
            Arc::new(move |snapshot: MemoSnapshot| {
                let Some(cache) = cache.upgrade() else {
                    return;
                };
                let count = snapshot.memos.len();
                let version = snapshot.version;
                if lock_cache(&cache).apply(generation, snapshot) {
                    debug!(
                        "event=memo_snapshot module=repo status=applied version={} count={}",
                        version, count
                    );
                } else {
                    debug!(
                        "event=memo_snapshot module=repo status=ignored version={}",
                        version
                    );
                }
            }),
        )?;

        *slot = Some(subscription);
        info!(
            "event=memo_repo_subscribe module=repo status=ok owner={} generation={}",
            owner, generation
        );
        Ok(())
    }

    /// Stops the live query and clears the cache. Safe to call repeatedly.
    pub fn unsubscribe(&self) {
        if let Some(previous) = self.subscription_slot().take() {
            previous.cancel();
            info!("event=memo_repo_unsubscribe module=repo status=ok");
        }
        let mut cache = self.cache();
        cache.generation += 1;
        cache.owner = None;
        cache.version = None;
        cache.memos.clear();
    }

    /// Owner of the active subscription.
    pub fn owner(&self) -> Option<SessionId> {
        self.cache().owner.clone()
    }

    /// Latest snapshot, newest memo first.
    pub fn memos(&self) -> Vec<Memo> {
        self.cache().memos.clone()
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    /// Distinct trimmed non-empty group names, first-seen order.
    pub fn group_names(&self) -> Vec<String> {
        distinct_group_names(&self.cache().memos)
    }

    /// First-writer-wins color per group name.
    pub fn group_colors(&self) -> HashMap<String, String> {
        first_group_colors(&self.cache().memos)
    }

    /// Group names paired with their display color.
    pub fn group_options(&self) -> Vec<GroupOption> {
        let cache = self.cache();
        let colors = first_group_colors(&cache.memos);
        distinct_group_names(&cache.memos)
            .into_iter()
            .map(|name| GroupOption {
                color: colors.get(&name).cloned(),
                name,
            })
            .collect()
    }

    /// Saves `text` under `group_name`.
    ///
    /// With `append_to_existing` and a non-empty group that already has a
    /// memo, the text is appended to that memo as a new line; otherwise a new
    /// memo is created.
    ///
    /// # Errors
    /// - `Precondition(NoSession)` when no subscription owner is set.
    /// - `Precondition(EmptyText)` when `text` is blank.
    /// - `Backend` for store failures.
    pub fn save(
        &self,
        text: &str,
        group_name: &str,
        append_to_existing: bool,
    ) -> MemoResult<SaveOutcome> {
        let owner = self.owner().ok_or(PreconditionError::NoSession)?;
        let text = normalize_text(text)?;
        let group_name = normalize_group_name(group_name);

        let Some(_in_flight) = InFlight::try_begin(&self.saving) else {
            debug!("event=memo_save module=repo status=skipped reason=in_flight");
            return Ok(SaveOutcome::Skipped);
        };

        if append_to_existing && !group_name.is_empty() {
            if let Some(target) = self.find_group_memo(&group_name) {
                if let Some(appended) = self.append_to(&target, &owner, &text)? {
                    return Ok(SaveOutcome::Appended(appended));
                }
                info!(
                    "event=memo_save module=repo status=fallback reason=append_target_gone doc_id={}",
                    target
                );
            }
        }

        let created = self.create(&owner, &text, &group_name)?;
        Ok(SaveOutcome::Created(created))
    }

    fn find_group_memo(&self, group_name: &str) -> Option<MemoId> {
        self.cache()
            .memos
            .iter()
            .find(|memo| memo.group_key() == group_name)
            .map(|memo| memo.id.clone())
    }

    /// Appends via compare-and-set. `None` when the target is gone.
    fn append_to(
        &self,
        target: &MemoId,
        owner: &SessionId,
        text: &str,
    ) -> MemoResult<Option<MemoId>> {
        for attempt in 1..=MAX_APPEND_ATTEMPTS {
            let Some(current) = self.store.get_memo(target)? else {
                return Ok(None);
            };
            if !current.is_owned_by(owner) {
                warn!(
                    "event=memo_save module=repo status=fallback reason=append_target_foreign doc_id={}",
                    target
                );
                return Ok(None);
            }

            let next = if current.text.is_empty() {
                text.to_string()
            } else {
                format!("{}\n{}", current.text, text)
            };
            match self.store.replace_text_if(target, &current.text, &next)? {
                ConditionalWrite::Applied => {
                    info!(
                        "event=memo_save module=repo status=ok mode=append doc_id={} attempt={}",
                        target, attempt
                    );
                    return Ok(Some(target.clone()));
                }
                ConditionalWrite::Missing => return Ok(None),
                ConditionalWrite::Conflict { .. } => {
                    debug!(
                        "event=memo_save module=repo status=conflict doc_id={} attempt={}",
                        target, attempt
                    );
                }
            }
        }

        Err(MemoError::backend(format!(
            "memo {target} kept changing during append"
        )))
    }

    fn create(&self, owner: &SessionId, text: &str, group_name: &str) -> MemoResult<MemoId> {
        let group_color = if group_name.is_empty() {
            None
        } else {
            self.group_colors()
                .remove(group_name)
                .and_then(|color| normalize_color(&color).ok())
        };
        let color = group_color.unwrap_or_else(|| self.default_color.clone());

        let memo = NewMemo::new(text, group_name, owner.clone(), Some(color))?;
        let created = self.store.create_memo(&memo)?;
        info!(
            "event=memo_save module=repo status=ok mode=create doc_id={} grouped={}",
            created.id,
            !group_name.is_empty()
        );
        Ok(created.id)
    }
}

impl<S: RemoteStore> Drop for MemoRepository<S> {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription_slot().take() {
            subscription.cancel();
        }
    }
}

fn lock_cache(cache: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}
