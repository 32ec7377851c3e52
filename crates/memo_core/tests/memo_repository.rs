mod common;

use common::CountingStore;
use memo_core::db::open_db_in_memory;
use memo_core::{
    MemoError, MemoRepository, PreconditionError, RemoteStore, SaveOutcome, SessionId,
    SqliteMemoStore, DEFAULT_MEMO_COLOR,
};
use std::sync::Arc;
use std::thread;

fn subscribed_repo(owner: &str) -> (Arc<CountingStore>, Arc<MemoRepository<CountingStore>>) {
    let store = Arc::new(CountingStore::new());
    let repo = Arc::new(MemoRepository::new(Arc::clone(&store), DEFAULT_MEMO_COLOR));
    repo.subscribe(SessionId::from(owner)).unwrap();
    (store, repo)
}

#[test]
fn save_without_session_is_a_precondition_error() {
    let store = Arc::new(CountingStore::new());
    let repo = MemoRepository::new(Arc::clone(&store), DEFAULT_MEMO_COLOR);

    let err = repo.save("hello", "", false).unwrap_err();
    assert!(matches!(
        err,
        MemoError::Precondition(PreconditionError::NoSession)
    ));
    assert_eq!(store.writes(), 0);
}

#[test]
fn blank_text_never_reaches_the_store() {
    let (store, repo) = subscribed_repo("u1");
    store.seed("a", "X", "u1", None);

    for text in ["", "   ", " \n\t "] {
        let err = repo.save(text, "X", true).unwrap_err();
        assert!(matches!(
            err,
            MemoError::Precondition(PreconditionError::EmptyText)
        ));
    }
    assert_eq!(store.writes(), 0);
    assert!(!repo.is_saving());
}

#[test]
fn append_to_existing_group_extends_the_memo_in_place() {
    let (store, repo) = subscribed_repo("u1");
    let existing = store.seed("a", "X", "u1", None);

    let outcome = repo.save("b", " X ", true).unwrap();
    assert_eq!(outcome, SaveOutcome::Appended(existing.id.clone()));
    assert_eq!(store.creates(), 0);

    let stored = store.get_memo(&existing.id).unwrap().unwrap();
    assert_eq!(stored.text, "a\nb");
    let cached = repo.memos();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].text, "a\nb");
}

#[test]
fn append_retries_after_a_concurrent_edit() {
    let (store, repo) = subscribed_repo("u1");
    let existing = store.seed("a", "X", "u1", None);
    store.interfere_with_next_replace("a edited");

    let outcome = repo.save("b", "X", true).unwrap();
    assert_eq!(outcome, SaveOutcome::Appended(existing.id.clone()));
    assert_eq!(store.replaces(), 2);
    assert_eq!(
        store.get_memo(&existing.id).unwrap().unwrap().text,
        "a edited\nb"
    );
}

#[test]
fn append_without_a_matching_group_creates_a_memo() {
    let (store, repo) = subscribed_repo("u1");
    store.seed("a", "X", "u1", None);

    let outcome = repo.save("b", "Y", true).unwrap();
    assert!(matches!(outcome, SaveOutcome::Created(_)));
    assert_eq!(store.creates(), 1);
    assert_eq!(repo.memos().len(), 2);
    assert_eq!(repo.group_names(), vec!["Y".to_string(), "X".to_string()]);
}

#[test]
fn new_group_save_creates_even_when_the_group_exists() {
    let (store, repo) = subscribed_repo("u1");
    store.seed("a", "X", "u1", Some("#ef4444"));

    let SaveOutcome::Created(id) = repo.save("b", "X", false).unwrap() else {
        panic!("expected a created memo");
    };
    assert_eq!(store.replaces(), 0);

    let created = store.get_memo(&id).unwrap().unwrap();
    assert_eq!(created.group_name, "X");
    assert_eq!(created.color.as_deref(), Some("#ef4444"));
}

#[test]
fn non_hex_group_color_is_not_inherited() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO documents (collection, doc_id, body) VALUES ('memos', 'legacy', ?1);",
        [r#"{"text":"a","groupName":"X","color":"red","userId":"u1","createdAt":1}"#],
    )
    .unwrap();
    let store = Arc::new(SqliteMemoStore::try_new(conn).unwrap());
    let repo = MemoRepository::new(Arc::clone(&store), DEFAULT_MEMO_COLOR);
    repo.subscribe(SessionId::from("u1")).unwrap();
    assert_eq!(repo.group_colors().get("X").map(String::as_str), Some("red"));

    let SaveOutcome::Created(id) = repo.save("b", "X", false).unwrap() else {
        panic!("expected a created memo");
    };
    let created = store.get_memo(&id).unwrap().unwrap();
    assert_eq!(created.group_name, "X");
    assert_eq!(created.color.as_deref(), Some(DEFAULT_MEMO_COLOR));
}

#[test]
fn ungrouped_memos_get_the_default_color() {
    let (store, repo) = subscribed_repo("u1");

    let SaveOutcome::Created(id) = repo.save("  note  ", "   ", true).unwrap() else {
        panic!("expected a created memo");
    };
    let created = store.get_memo(&id).unwrap().unwrap();
    assert_eq!(created.text, "note");
    assert_eq!(created.group_name, "");
    assert_eq!(created.color.as_deref(), Some(DEFAULT_MEMO_COLOR));
    assert_eq!(created.owner_id, SessionId::from("u1"));
}

#[test]
fn overlapping_saves_write_exactly_once() {
    let (store, repo) = subscribed_repo("u1");
    let (entered, release) = store.hold_next_create();

    let first = {
        let repo = Arc::clone(&repo);
        thread::spawn(move || repo.save("one", "", false))
    };
    entered.recv().unwrap();

    assert!(repo.is_saving());
    assert_eq!(repo.save("two", "", false).unwrap(), SaveOutcome::Skipped);

    release.send(()).unwrap();
    let first = first.join().unwrap().unwrap();
    assert!(matches!(first, SaveOutcome::Created(_)));
    assert_eq!(store.creates(), 1);
    assert!(!repo.is_saving());

    let memos = repo.memos();
    assert_eq!(memos.len(), 1);
    assert_eq!(memos[0].text, "one");
}

#[test]
fn resubscribing_never_exposes_the_previous_owner() {
    let (store, repo) = subscribed_repo("u1");
    store.seed("mine", "Work", "u1", Some("#3b82f6"));
    assert_eq!(repo.memos().len(), 1);

    repo.subscribe(SessionId::from("u2")).unwrap();
    assert!(repo.memos().is_empty());
    assert!(repo.group_names().is_empty());
    assert_eq!(store.inner().subscriber_count(), 1);

    store.seed("late", "", "u1", None);
    assert!(repo.memos().is_empty());

    store.seed("theirs", "", "u2", None);
    let memos = repo.memos();
    assert_eq!(memos.len(), 1);
    assert_eq!(memos[0].owner_id, SessionId::from("u2"));
}

#[test]
fn unsubscribe_clears_cache_and_is_idempotent() {
    let (store, repo) = subscribed_repo("u1");
    store.seed("a", "", "u1", None);

    repo.unsubscribe();
    repo.unsubscribe();
    assert_eq!(repo.owner(), None);
    assert!(repo.memos().is_empty());
    assert_eq!(store.inner().subscriber_count(), 0);

    store.seed("b", "", "u1", None);
    assert!(repo.memos().is_empty());
}

#[test]
fn group_options_pair_names_with_first_colors() {
    let (store, repo) = subscribed_repo("u1");
    store.seed("old", "Work", "u1", Some("#ef4444"));
    store.seed("home", "Home", "u1", None);
    store.seed("new", "Work", "u1", Some("#22c55e"));

    let options = repo.group_options();
    assert_eq!(options.len(), 2);
    assert_eq!(options[0].name, "Work");
    assert_eq!(options[0].color.as_deref(), Some("#22c55e"));
    assert_eq!(options[1].name, "Home");
    assert_eq!(options[1].color, None);
    assert_eq!(repo.group_colors().len(), 1);
}

#[test]
fn dropping_the_repository_cancels_its_subscription() {
    let (store, repo) = subscribed_repo("u1");
    assert_eq!(store.inner().subscriber_count(), 1);
    drop(repo);
    assert_eq!(store.inner().subscriber_count(), 0);
}
