use memo_core::{
    AdBanner, CoreConfig, DetailTarget, GroupDisplayMode, MemoApp, MemoError, RemoteStore,
    SaveOutcome,
};

#[test]
fn restart_restores_the_session_and_its_memos() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memo.db");

    let (session, memo_id) = {
        let app = MemoApp::open(&path, CoreConfig::default()).unwrap();
        let mut entry = app.entry_composer();
        entry.set_text("remember me");
        let SaveOutcome::Created(id) = entry.submit().unwrap().outcome else {
            panic!("expected a created memo");
        };
        (app.session().unwrap(), id)
    };

    let app = MemoApp::open(&path, CoreConfig::default()).unwrap();
    assert_eq!(app.session(), Some(session));
    let memos = app.repository().memos();
    assert_eq!(memos.len(), 1);
    assert_eq!(memos[0].id, memo_id);
}

#[test]
fn new_session_after_sign_out_cannot_open_old_memos() {
    let app = MemoApp::open_in_memory(CoreConfig::default()).unwrap();
    let mut entry = app.entry_composer();
    entry.set_text("old session");
    let SaveOutcome::Created(id) = entry.submit().unwrap().outcome else {
        panic!("expected a created memo");
    };

    app.sign_out().unwrap();
    let fresh = app.sign_in().unwrap();
    assert_eq!(app.repository().owner(), Some(fresh));
    assert!(app.repository().memos().is_empty());

    let err = app.open_detail(DetailTarget::Existing(id.clone())).err().unwrap();
    assert!(matches!(err, MemoError::Permission(_)));

    let err = app.delete_memos(&[id.clone()]).unwrap_err();
    assert!(matches!(err, MemoError::Permission(_)));
    assert!(app.store().get_memo(&id).unwrap().is_some());
}

#[test]
fn config_drives_list_mode_and_ad_slot() {
    let config = CoreConfig::from_json_str(
        r#"{"group_display_mode":"aggregated","ads":{"enabled":true,"unit_id":"banner-1"}}"#,
    )
    .unwrap();
    let app = MemoApp::open_in_memory(config).unwrap();

    assert_eq!(app.list_view().mode(), GroupDisplayMode::Aggregated);
    assert_eq!(
        app.ads().banner(),
        AdBanner::Live {
            unit_id: "banner-1".to_string()
        }
    );

    let default_app = MemoApp::open_in_memory(CoreConfig::default()).unwrap();
    assert_eq!(default_app.list_view().mode(), GroupDisplayMode::PerMemo);
    assert!(matches!(
        default_app.ads().banner(),
        AdBanner::Placeholder { .. }
    ));
}
