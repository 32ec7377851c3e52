mod common;

use common::CountingStore;
use memo_core::service::list_service::{delete_all, delete_item};
use memo_core::{
    GroupDisplayMode, ListItem, MemoError, MemoListView, MemoRepository, RemoteStore, SessionId,
    DEFAULT_MEMO_COLOR,
};
use std::sync::Arc;

fn owner() -> SessionId {
    SessionId::from("u1")
}

fn live_repo(store: &Arc<CountingStore>) -> MemoRepository<CountingStore> {
    let repo = MemoRepository::new(Arc::clone(store), DEFAULT_MEMO_COLOR);
    repo.subscribe(owner()).unwrap();
    repo
}

#[test]
fn bulk_delete_issues_one_delete_per_id_and_clears_selection() {
    let store = Arc::new(CountingStore::new());
    let repo = live_repo(&store);
    let ids: Vec<_> = ["1", "2", "3"]
        .into_iter()
        .map(|text| store.seed(text, "", "u1", None).id)
        .collect();

    let mut view = MemoListView::new(GroupDisplayMode::PerMemo);
    view.enter_select_mode();
    for id in &ids {
        assert!(view.toggle_select(id.as_str()));
    }
    assert_eq!(view.selected_count(), 3);

    let deleted = view.delete_selected(store.as_ref(), &owner(), &repo.memos()).unwrap();
    assert_eq!(deleted, 3);
    assert_eq!(store.deletes(), 3);
    assert_eq!(view.selected_count(), 0);
    assert!(!view.is_select_mode());
    assert!(repo.memos().is_empty());
}

#[test]
fn aggregated_bucket_delete_removes_every_memo_of_the_group() {
    let store = Arc::new(CountingStore::new());
    let repo = live_repo(&store);
    store.seed("a", "X", "u1", None);
    store.seed("b", " X ", "u1", None);
    store.seed("c", "", "u1", None);

    let mut view = MemoListView::new(GroupDisplayMode::Aggregated);
    let items = view.items(&repo.memos());
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].preview(), "b\n\na");

    view.enter_select_mode();
    view.toggle_select("X");
    assert_eq!(view.delete_selected(store.as_ref(), &owner(), &repo.memos()).unwrap(), 2);
    assert_eq!(store.deletes(), 2);

    let remaining = repo.memos();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].text, "c");
}

#[test]
fn failed_bulk_delete_keeps_selection() {
    let store = Arc::new(CountingStore::new());
    let repo = live_repo(&store);
    let memo = store.seed("a", "", "u1", None);
    store.fail_deletes(true);

    let mut view = MemoListView::new(GroupDisplayMode::PerMemo);
    view.enter_select_mode();
    view.toggle_select(memo.id.as_str());

    let err = view
        .delete_selected(store.as_ref(), &owner(), &repo.memos())
        .unwrap_err();
    assert!(matches!(err, MemoError::Backend(_)));
    assert!(view.is_select_mode());
    assert_eq!(view.selected_count(), 1);
    assert_eq!(repo.memos().len(), 1);
}

#[test]
fn swipe_delete_removes_the_whole_row() {
    let store = Arc::new(CountingStore::new());
    let repo = live_repo(&store);
    store.seed("a", "X", "u1", None);
    store.seed("b", "X", "u1", None);

    let view = MemoListView::new(GroupDisplayMode::Aggregated);
    let items = view.items(&repo.memos());
    let ListItem::Group(card) = &items[0] else {
        panic!("aggregated mode yields group cards");
    };
    assert_eq!(card.ids.len(), 2);

    assert_eq!(delete_item(store.as_ref(), &owner(), &items[0]).unwrap(), 2);
    assert!(repo.memos().is_empty());
}

#[test]
fn delete_of_another_sessions_memo_is_refused() {
    let store = Arc::new(CountingStore::new());
    let repo = live_repo(&store);
    let mine = store.seed("mine", "", "u1", None);
    let theirs = store.seed("theirs", "", "u2", None);

    let err = delete_all(store.as_ref(), &owner(), &[theirs.id.clone()]).unwrap_err();
    assert!(matches!(err, MemoError::Permission(ref id) if *id == theirs.id));
    assert!(store.get_memo(&theirs.id).unwrap().is_some());

    delete_all(store.as_ref(), &owner(), &[mine.id.clone()]).unwrap();
    assert!(repo.memos().is_empty());
    assert!(store.get_memo(&theirs.id).unwrap().is_some());
}
