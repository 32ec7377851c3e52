//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, screen-level functions to Dart via FRB.
//! - Translate core errors into flat response envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - The app context is opened once per process; later `app_open` calls are
//!   no-ops that report the active session.
//! - Envelope messages never echo memo text.

use log::warn;
use memo_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AdBanner, CoreConfig, DetailTarget, GroupDisplayMode, ListItem, MemoApp, MemoError, MemoId,
    Route, SaveOutcome, SqliteMemoStore, MEMO_COLOR_PALETTE,
};
use std::path::PathBuf;
use std::sync::OnceLock;

const APP_DB_FILE_NAME: &str = "memo_app.sqlite3";
static APP: OnceLock<MemoApp<SqliteMemoStore>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Stable error code (`not_found|permission_denied|...`) on failure.
    pub code: Option<String>,
    /// Human-readable message for diagnostics/UI.
    pub message: String,
    /// Route to navigate to after success.
    pub navigate_to: Option<String>,
    /// Whether acknowledging the failure should navigate back.
    pub navigate_back: bool,
}

impl ActionResponse {
    fn success(message: impl Into<String>, navigate_to: Option<Route>) -> Self {
        Self {
            ok: true,
            code: None,
            message: message.into(),
            navigate_to: navigate_to.map(|route| route.path()),
            navigate_back: false,
        }
    }

    fn failure(err: &MemoError) -> Self {
        let alert = err.alert();
        Self {
            ok: false,
            code: Some(err.code().to_string()),
            message: alert.message,
            navigate_to: None,
            navigate_back: alert.navigate_back,
        }
    }

    fn load_failure(err: &MemoError) -> Self {
        let alert = err.load_alert();
        Self {
            ok: false,
            code: Some(err.code().to_string()),
            message: alert.message,
            navigate_to: None,
            navigate_back: alert.navigate_back,
        }
    }

    fn not_ready(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            code: Some("not_ready".to_string()),
            message: message.into(),
            navigate_to: None,
            navigate_back: false,
        }
    }
}

/// Result of opening the app context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppOpenResponse {
    pub ok: bool,
    /// Anonymous session id driving every owner-filtered query.
    pub session_id: Option<String>,
    pub message: String,
}

/// Opens store, identity and live memo query.
///
/// Input semantics:
/// - `db_path`: database file; empty uses `MEMO_DB_PATH` or a temp file.
/// - `config_json`: `CoreConfig` JSON; empty means defaults. A `log_dir`
///   starts file logging at the configured `log_level` before the DB opens.
///
/// # FFI contract
/// - Sync call; performs DB bootstrap and migrations.
/// - Idempotent once opened; config of later calls is ignored.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn app_open(db_path: String, config_json: String) -> AppOpenResponse {
    if let Some(app) = APP.get() {
        return opened(app, "App already open.");
    }

    let config = match CoreConfig::from_json_str(&config_json) {
        Ok(config) => config,
        Err(err) => {
            return AppOpenResponse {
                ok: false,
                session_id: None,
                message: format!("app_open failed: {err}"),
            };
        }
    };
    if let Err(err) = config.start_logging() {
        return AppOpenResponse {
            ok: false,
            session_id: None,
            message: format!("app_open failed: {err}"),
        };
    }

    match MemoApp::open(resolve_db_path(&db_path), config) {
        Ok(app) => {
            // A concurrent caller may have won; its context stays active.
            let _ = APP.set(app);
            match APP.get() {
                Some(app) => opened(app, "App opened."),
                None => AppOpenResponse {
                    ok: false,
                    session_id: None,
                    message: "app_open failed: context unavailable".to_string(),
                },
            }
        }
        Err(err) => AppOpenResponse {
            ok: false,
            session_id: None,
            message: format!("app_open failed: {err}"),
        },
    }
}

fn opened(app: &MemoApp<SqliteMemoStore>, message: &str) -> AppOpenResponse {
    AppOpenResponse {
        ok: true,
        session_id: app.session().map(|session| session.to_string()),
        message: message.to_string(),
    }
}

/// Group offered by the entry screen picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOptionItem {
    pub name: String,
    /// `#rrggbb`, absent when no memo of the group has a color.
    pub color: Option<String>,
}

/// Lists existing groups of the current session.
///
/// # FFI contract
/// - Sync call, reads the live cache only.
/// - Returns an empty list before `app_open`.
#[flutter_rust_bridge::frb(sync)]
pub fn entry_group_options() -> Vec<GroupOptionItem> {
    let Some(app) = APP.get() else {
        return Vec::new();
    };
    app.repository()
        .group_options()
        .into_iter()
        .map(|option| GroupOptionItem {
            name: option.name,
            color: option.color,
        })
        .collect()
}

/// Save response for the entry screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySaveResponse {
    pub action: ActionResponse,
    /// `created|appended|skipped` on success.
    pub outcome: Option<String>,
    /// Memo written by this save.
    pub memo_id: Option<String>,
}

/// Saves entry screen text.
///
/// Input semantics:
/// - `new_group_name`: typed group; non-empty wins and always creates.
/// - `selected_group`: existing group picked from `entry_group_options`;
///   appends to that group's newest memo.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - A save overlapping another one reports `skipped` and writes nothing.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn entry_save(
    text: String,
    new_group_name: String,
    selected_group: Option<String>,
) -> EntrySaveResponse {
    let Some(app) = APP.get() else {
        return EntrySaveResponse {
            action: ActionResponse::not_ready("entry_save failed: app is not open"),
            outcome: None,
            memo_id: None,
        };
    };

    let mut composer = app.entry_composer();
    composer.set_text(text);
    composer.set_new_group_name(new_group_name);
    composer.select_group(selected_group);

    match composer.submit() {
        Ok(submission) => {
            let (outcome, memo_id, message) = match &submission.outcome {
                SaveOutcome::Created(id) => ("created", Some(id.to_string()), "Memo saved."),
                SaveOutcome::Appended(id) => ("appended", Some(id.to_string()), "Memo appended."),
                SaveOutcome::Skipped => ("skipped", None, "A save is already in progress."),
            };
            EntrySaveResponse {
                action: ActionResponse::success(message, submission.navigate_to),
                outcome: Some(outcome.to_string()),
                memo_id,
            }
        }
        Err(err) => {
            warn!(
                "event=ffi_entry_save module=ffi status=error code={}",
                err.code()
            );
            EntrySaveResponse {
                action: ActionResponse::failure(&err),
                outcome: None,
                memo_id: None,
            }
        }
    }
}

/// One row of the list screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoListItem {
    /// Selection key (memo id, group name or `__none__`).
    pub key: String,
    /// Every memo id a delete of this row removes.
    pub memo_ids: Vec<String>,
    pub group_name: String,
    pub preview: String,
    pub color: String,
    /// Detail route opened by tapping the row.
    pub open_route: Option<String>,
}

/// List screen response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoListResponse {
    pub ok: bool,
    pub items: Vec<MemoListItem>,
    /// Effective display mode (`aggregated|per-memo`).
    pub mode: String,
    pub message: String,
}

/// Projects the current live snapshot into list rows.
///
/// Input semantics:
/// - `mode`: `aggregated|per-memo`; `None` or unknown uses the configured mode.
///
/// # FFI contract
/// - Sync call, reads the live cache only.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn memo_list(mode: Option<String>) -> MemoListResponse {
    let Some(app) = APP.get() else {
        return MemoListResponse {
            ok: false,
            items: Vec::new(),
            mode: display_mode_label(GroupDisplayMode::default()).to_string(),
            message: "memo_list failed: app is not open".to_string(),
        };
    };

    let mut view = app.list_view();
    if let Some(mode) = mode.as_deref().and_then(parse_display_mode) {
        view.set_mode(mode);
    }
    let items = view
        .items(&app.repository().memos())
        .iter()
        .map(|item| to_list_item(&view, item))
        .collect::<Vec<_>>();
    let message = if items.is_empty() {
        "No memos yet.".to_string()
    } else {
        format!("{} item(s).", items.len())
    };

    MemoListResponse {
        ok: true,
        items,
        mode: display_mode_label(view.mode()).to_string(),
        message,
    }
}

/// Detail screen state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailResponse {
    pub action: ActionResponse,
    /// `None` for a new memo.
    pub memo_id: Option<String>,
    pub text: String,
    pub group_name: String,
    pub color: String,
    /// Colors offered by the picker.
    pub palette: Vec<String>,
}

/// Loads the detail editor for `id` (`new` starts a blank memo).
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Load failures (foreign, missing, store errors) set `navigate_back = true`
///   and carry no content. Only a missing session stays on the screen.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn detail_load(id: String) -> DetailResponse {
    let empty = |action: ActionResponse| DetailResponse {
        action,
        memo_id: None,
        text: String::new(),
        group_name: String::new(),
        color: String::new(),
        palette: palette(),
    };

    let Some(app) = APP.get() else {
        return empty(ActionResponse::not_ready("detail_load failed: app is not open"));
    };
    let target = match DetailTarget::from_route_id(&id) {
        Ok(target) => target,
        Err(_) => {
            let err = MemoError::NotFound(MemoId::new(id));
            return empty(ActionResponse::load_failure(&err));
        }
    };

    match app.open_detail(target) {
        Ok(editor) => DetailResponse {
            action: ActionResponse::success("Memo loaded.", None),
            memo_id: match editor.target() {
                DetailTarget::New => None,
                DetailTarget::Existing(id) => Some(id.to_string()),
            },
            text: editor.text().to_string(),
            group_name: editor.group_name().to_string(),
            color: editor.color().to_string(),
            palette: palette(),
        },
        Err(err) => {
            warn!(
                "event=ffi_detail_load module=ffi status=error code={}",
                err.code()
            );
            empty(ActionResponse::load_failure(&err))
        }
    }
}

/// Saves the detail editor.
///
/// Input semantics:
/// - `id`: memo id, or `new` to create.
/// - `color`: `#rrggbb`; empty keeps the loaded/default color.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - On success `navigate_to` is the list route.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn detail_save(id: String, text: String, group_name: String, color: String) -> ActionResponse {
    let Some(app) = APP.get() else {
        return ActionResponse::not_ready("detail_save failed: app is not open");
    };
    let target = match DetailTarget::from_route_id(&id) {
        Ok(target) => target,
        Err(_) => return ActionResponse::failure(&MemoError::NotFound(MemoId::new(id))),
    };

    let result = app.open_detail(target).and_then(|mut editor| {
        editor.set_text(text);
        editor.set_group_name(group_name);
        if !color.trim().is_empty() {
            editor.set_color(&color)?;
        }
        editor.save()
    });
    match result {
        Ok(route) => ActionResponse::success("Memo saved.", Some(route)),
        Err(err) => {
            warn!(
                "event=ffi_detail_save module=ffi status=error code={}",
                err.code()
            );
            ActionResponse::failure(&err)
        }
    }
}

/// Deletes memos by id, one concurrent delete per id.
///
/// # FFI contract
/// - Sync call; returns after every delete finished.
/// - Partial failures are not rolled back.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn memos_delete(memo_ids: Vec<String>) -> ActionResponse {
    let Some(app) = APP.get() else {
        return ActionResponse::not_ready("memos_delete failed: app is not open");
    };
    let ids = memo_ids.into_iter().map(MemoId::from).collect::<Vec<_>>();
    match app.delete_memos(&ids) {
        Ok(()) => ActionResponse::success(format!("Deleted {} memo(s).", ids.len()), None),
        Err(err) => ActionResponse::failure(&err),
    }
}

/// Banner slot content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdBannerResponse {
    /// Whether a live ad unit should be rendered.
    pub live: bool,
    pub unit_id: Option<String>,
    /// Placeholder label when not live.
    pub label: Option<String>,
}

/// Describes what the banner slot shows.
///
/// # FFI contract
/// - Sync call, no I/O.
/// - Before `app_open` the placeholder is reported.
#[flutter_rust_bridge::frb(sync)]
pub fn ad_banner() -> AdBannerResponse {
    let banner = match APP.get() {
        Some(app) => app.ads().banner(),
        None => memo_core::AdCapability::from_config(&Default::default()).banner(),
    };
    match banner {
        AdBanner::Live { unit_id } => AdBannerResponse {
            live: true,
            unit_id: Some(unit_id),
            label: None,
        },
        AdBanner::Placeholder { label } => AdBannerResponse {
            live: false,
            unit_id: None,
            label: Some(label),
        },
    }
}

fn resolve_db_path(db_path: &str) -> PathBuf {
    let trimmed = db_path.trim();
    if !trimmed.is_empty() {
        return PathBuf::from(trimmed);
    }
    if let Ok(raw) = std::env::var("MEMO_DB_PATH") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(APP_DB_FILE_NAME)
}

fn palette() -> Vec<String> {
    MEMO_COLOR_PALETTE
        .iter()
        .map(|color| color.to_string())
        .collect()
}

fn parse_display_mode(raw: &str) -> Option<GroupDisplayMode> {
    match raw.trim() {
        "aggregated" => Some(GroupDisplayMode::Aggregated),
        "per-memo" => Some(GroupDisplayMode::PerMemo),
        _ => None,
    }
}

fn display_mode_label(mode: GroupDisplayMode) -> &'static str {
    match mode {
        GroupDisplayMode::Aggregated => "aggregated",
        GroupDisplayMode::PerMemo => "per-memo",
    }
}

fn to_list_item(view: &memo_core::MemoListView, item: &ListItem) -> MemoListItem {
    MemoListItem {
        key: item.key().to_string(),
        memo_ids: item.ids().iter().map(|id| id.to_string()).collect(),
        group_name: item.group_name().to_string(),
        preview: item.preview(),
        color: item.display_color().to_string(),
        open_route: view.open_target(item).map(|route| route.path()),
    }
}
