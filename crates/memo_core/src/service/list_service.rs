//! List screen use-case: projection, selection mode and deletes.
//!
//! # Responsibility
//! - Project the live snapshot into rows for the configured display mode.
//! - Track selection mode and selected row keys.
//! - Delete selected rows, one store delete per memo id, concurrently.
//!
//! # Invariants
//! - Selection keys are only meaningful for the current display mode.
//! - A failed bulk delete keeps the selection; nothing is rolled back.

use crate::error::{MemoError, MemoResult};
use crate::model::memo::{Memo, MemoId, SessionId};
use crate::navigation::Route;
use crate::projection::grouping::{project_list, GroupDisplayMode, ListItem};
use crate::store::{RemoteStore, StoreError};
use log::{error, info};
use std::collections::{BTreeSet, HashSet};
use std::thread;

/// Selection state of the list screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoListView {
    mode: GroupDisplayMode,
    select_mode: bool,
    selected: BTreeSet<String>,
}

impl MemoListView {
    pub fn new(mode: GroupDisplayMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> GroupDisplayMode {
        self.mode
    }

    /// Switches display mode. Selection keys do not carry over.
    pub fn set_mode(&mut self, mode: GroupDisplayMode) {
        if self.mode != mode {
            self.mode = mode;
            self.cancel_select();
        }
    }

    pub fn items(&self, memos: &[Memo]) -> Vec<ListItem> {
        project_list(memos, self.mode)
    }

    pub fn is_select_mode(&self) -> bool {
        self.select_mode
    }

    pub fn enter_select_mode(&mut self) {
        self.select_mode = true;
    }

    /// Leaves selection mode and drops every selected key.
    pub fn cancel_select(&mut self) {
        self.select_mode = false;
        self.selected.clear();
    }

    /// Flips the selection of `key`. Returns whether it is now selected.
    ///
    /// Ignored outside selection mode.
    pub fn toggle_select(&mut self, key: &str) -> bool {
        if !self.select_mode {
            return false;
        }
        if self.selected.remove(key) {
            false
        } else {
            self.selected.insert(key.to_string());
            true
        }
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selected.contains(key)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Route opened by tapping `item`: its newest memo.
    pub fn open_target(&self, item: &ListItem) -> Option<Route> {
        item.primary_id().cloned().map(Route::detail)
    }

    /// Tap handling: toggles in selection mode, otherwise opens the item.
    pub fn activate(&mut self, item: &ListItem) -> Option<Route> {
        if self.select_mode {
            self.toggle_select(item.key());
            return None;
        }
        self.open_target(item)
    }

    /// Memo ids behind the selected rows of `memos`, deduplicated.
    pub fn selected_ids(&self, memos: &[Memo]) -> Vec<MemoId> {
        let mut seen = HashSet::new();
        self.items(memos)
            .iter()
            .filter(|item| self.selected.contains(item.key()))
            .flat_map(ListItem::ids)
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }

    /// Deletes every memo behind the selected rows.
    ///
    /// On success the selection is cleared and selection mode ends. Returns
    /// the number of memo ids deleted.
    ///
    /// # Errors
    /// The first failed delete. Deletes that already succeeded stay applied.
    pub fn delete_selected<S: RemoteStore>(
        &mut self,
        store: &S,
        owner: &SessionId,
        memos: &[Memo],
    ) -> MemoResult<usize> {
        let ids = self.selected_ids(memos);
        delete_all(store, owner, &ids)?;
        self.cancel_select();
        Ok(ids.len())
    }
}

/// Deletes every memo behind one row (swipe to delete).
pub fn delete_item<S: RemoteStore>(
    store: &S,
    owner: &SessionId,
    item: &ListItem,
) -> MemoResult<usize> {
    let ids = item.ids();
    delete_all(store, owner, &ids)?;
    Ok(ids.len())
}

/// Issues one delete per id concurrently and waits for all of them.
///
/// Ids owned by another session fail with `Permission` and stay stored.
pub fn delete_all<S: RemoteStore>(
    store: &S,
    owner: &SessionId,
    ids: &[MemoId],
) -> MemoResult<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let results: Vec<Result<(), StoreError>> = thread::scope(|scope| {
        let workers: Vec<_> = ids
            .iter()
            .map(|id| scope.spawn(move || store.delete_memo(id, owner)))
            .collect();
        workers
            .into_iter()
            .map(|worker| {
                worker.join().unwrap_or_else(|_| {
                    Err(StoreError::Unavailable("delete worker panicked".to_string()))
                })
            })
            .collect()
    });

    let total = results.len();
    let mut failures = results.into_iter().filter_map(Result::err);
    match failures.next() {
        None => {
            info!("event=memo_delete module=service status=ok count={total}");
            Ok(())
        }
        Some(first) => {
            let failed = 1 + failures.count();
            error!(
                "event=memo_delete module=service status=error failed={} count={} error={}",
                failed, total, first
            );
            Err(MemoError::from(first))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MemoListView;
    use crate::model::memo::{Memo, MemoId, SessionId};
    use crate::navigation::Route;
    use crate::projection::grouping::{GroupDisplayMode, UNGROUPED_KEY};

    fn memo(id: &str, group: &str) -> Memo {
        Memo {
            id: MemoId::from(id),
            text: id.to_string(),
            group_name: group.to_string(),
            color: None,
            owner_id: SessionId::from("u1"),
            created_at: 0,
        }
    }

    #[test]
    fn toggle_requires_selection_mode() {
        let mut view = MemoListView::new(GroupDisplayMode::PerMemo);
        assert!(!view.toggle_select("id1"));
        assert_eq!(view.selected_count(), 0);

        view.enter_select_mode();
        assert!(view.toggle_select("id1"));
        assert!(view.toggle_select("id2"));
        assert!(!view.toggle_select("id1"));
        assert_eq!(view.selected_count(), 1);

        view.cancel_select();
        assert!(!view.is_select_mode());
        assert_eq!(view.selected_count(), 0);
    }

    #[test]
    fn aggregated_selection_expands_to_every_memo_of_the_group() {
        let memos = vec![memo("id1", "X"), memo("id2", "X"), memo("id3", "")];
        let mut view = MemoListView::new(GroupDisplayMode::Aggregated);
        view.enter_select_mode();
        view.toggle_select("X");
        view.toggle_select(UNGROUPED_KEY);

        assert_eq!(
            view.selected_ids(&memos),
            vec![MemoId::from("id1"), MemoId::from("id2"), MemoId::from("id3")]
        );
    }

    #[test]
    fn activate_opens_newest_memo_outside_selection_mode() {
        let memos = vec![memo("id1", "X"), memo("id2", "X")];
        let mut view = MemoListView::new(GroupDisplayMode::Aggregated);
        let items = view.items(&memos);

        assert_eq!(
            view.activate(&items[0]),
            Some(Route::detail(MemoId::from("id1")))
        );

        view.enter_select_mode();
        assert_eq!(view.activate(&items[0]), None);
        assert!(view.is_selected("X"));
    }

    #[test]
    fn switching_mode_drops_selection() {
        let mut view = MemoListView::new(GroupDisplayMode::PerMemo);
        view.enter_select_mode();
        view.toggle_select("id1");
        view.set_mode(GroupDisplayMode::Aggregated);
        assert_eq!(view.selected_count(), 0);
        assert!(!view.is_select_mode());
    }
}
