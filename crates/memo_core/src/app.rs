//! Application context.
//!
//! # Responsibility
//! - Wire configuration, store, identity, repository and ad capability.
//! - Keep the repository subscription following the current session.
//! - Hand out per-screen use-case objects.
//!
//! # Invariants
//! - The repository is subscribed to exactly the current session; sign-out
//!   unsubscribes it.
//! - Screens that need a session fail with `Precondition(NoSession)` until
//!   one exists.

use crate::ads::AdCapability;
use crate::config::CoreConfig;
use crate::error::{MemoError, MemoResult, PreconditionError};
use crate::identity::{bootstrap_session, IdentityProvider, SessionEvent, SqliteIdentityProvider};
use crate::model::memo::{MemoId, SessionId};
use crate::navigation::DetailTarget;
use crate::repo::memo_repo::MemoRepository;
use crate::service::detail_service::DetailEditor;
use crate::service::entry_service::EntryComposer;
use crate::service::list_service::{delete_all, MemoListView};
use crate::store::sqlite_store::SqliteMemoStore;
use crate::store::{RemoteStore, Subscription};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

/// Long-lived application state shared by every screen.
pub struct MemoApp<S: RemoteStore + 'static> {
    config: CoreConfig,
    identity: Arc<dyn IdentityProvider>,
    repository: Arc<MemoRepository<S>>,
    ads: AdCapability,
    _session_watch: Subscription,
}

impl MemoApp<SqliteMemoStore> {
    /// Opens store and identity in the same database file.
    pub fn open(db_path: impl AsRef<Path>, config: CoreConfig) -> MemoResult<Self> {
        let db_path = db_path.as_ref();
        let store = Arc::new(SqliteMemoStore::open(db_path)?);
        let identity = Arc::new(SqliteIdentityProvider::open(db_path)?);
        Self::start(config, store, identity)
    }

    /// Fully in-memory app, used by tests and previews.
    pub fn open_in_memory(config: CoreConfig) -> MemoResult<Self> {
        let store = Arc::new(SqliteMemoStore::open_in_memory()?);
        let identity = Arc::new(SqliteIdentityProvider::open_in_memory()?);
        Self::start(config, store, identity)
    }
}

impl<S: RemoteStore + 'static> MemoApp<S> {
    /// Boots the session and starts the live memo query.
    ///
    /// # Errors
    /// `Backend` when the identity provider or the store fails.
    pub fn start(
        config: CoreConfig,
        store: Arc<S>,
        identity: Arc<dyn IdentityProvider>,
    ) -> MemoResult<Self> {
        let repository = Arc::new(MemoRepository::new(store, config.default_color.clone()));
        let ads = AdCapability::from_config(&config.ads);

        let watched = Arc::downgrade(&repository);
        let session_watch = identity.on_session_change(Arc::new(move |event: SessionEvent| {
            let Some(repository) = watched.upgrade() else {
                return;
            };
            match event.session() {
                Some(session) => {
                    if repository.owner().as_ref() == Some(session) {
                        return;
                    }
                    if let Err(err) = repository.subscribe(session.clone()) {
                        warn!(
                            "event=session_follow module=app status=error code={} error={}",
                            err.code(),
                            err
                        );
                    }
                }
                None => repository.unsubscribe(),
            }
        }));

        let session = bootstrap_session(identity.as_ref())?;
        if repository.owner().as_ref() != Some(&session) {
            repository.subscribe(session)?;
        }

        info!(
            "event=app_start module=app status=ok display_mode={:?} ads={}",
            config.group_display_mode,
            matches!(ads, AdCapability::Available(_))
        );
        Ok(Self {
            config,
            identity,
            repository,
            ads,
            _session_watch: session_watch,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn ads(&self) -> &AdCapability {
        &self.ads
    }

    pub fn repository(&self) -> &Arc<MemoRepository<S>> {
        &self.repository
    }

    pub fn store(&self) -> &Arc<S> {
        self.repository.store()
    }

    pub fn session(&self) -> Option<SessionId> {
        self.identity.current_session()
    }

    fn require_session(&self) -> MemoResult<SessionId> {
        self.session()
            .ok_or(MemoError::Precondition(PreconditionError::NoSession))
    }

    pub fn entry_composer(&self) -> EntryComposer<S> {
        EntryComposer::new(Arc::clone(&self.repository))
    }

    pub fn list_view(&self) -> MemoListView {
        MemoListView::new(self.config.group_display_mode)
    }

    /// # Errors
    /// `Precondition(NoSession)`, `NotFound` or `Permission`.
    pub fn open_detail(&self, target: DetailTarget) -> MemoResult<DetailEditor<S>> {
        let session = self.require_session()?;
        DetailEditor::open(
            Arc::clone(self.store()),
            session,
            target,
            &self.config.default_color,
        )
    }

    /// Deletes memos of the current session by id.
    ///
    /// # Errors
    /// `Precondition(NoSession)`, or the first failed delete (`Permission`
    /// for a memo of another session).
    pub fn delete_memos(&self, ids: &[MemoId]) -> MemoResult<()> {
        let session = self.require_session()?;
        delete_all(self.store().as_ref(), &session, ids)
    }

    pub fn sign_out(&self) -> MemoResult<()> {
        self.identity.sign_out()?;
        Ok(())
    }

    /// Starts a fresh anonymous session after a sign-out.
    pub fn sign_in(&self) -> MemoResult<SessionId> {
        Ok(bootstrap_session(self.identity.as_ref())?)
    }
}
