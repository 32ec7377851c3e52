use memo_core::{logging_status, CoreConfig};

#[test]
fn configured_log_level_drives_file_logging() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = dir.path().to_string_lossy().to_string();
    let raw = serde_json::json!({ "log_level": "WARNING", "log_dir": log_dir }).to_string();
    let config = CoreConfig::from_json_str(&raw).unwrap();

    assert!(config.start_logging().unwrap());
    let (level, active_dir) = logging_status().unwrap();
    assert_eq!(level, "warn");
    assert_eq!(active_dir, dir.path());

    // Same settings again are accepted; a different level is a conflict.
    assert!(config.start_logging().unwrap());
    let other = CoreConfig {
        log_level: "error".to_string(),
        ..config.clone()
    };
    assert!(other.start_logging().is_err());
}
