//! Core domain logic for the memo app.
//! This crate is the single source of truth for memo invariants: ownership,
//! grouping, live snapshots and save semantics.

pub mod ads;
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod logging;
pub mod model;
pub mod navigation;
pub mod projection;
pub mod repo;
pub mod service;
pub mod store;

pub use ads::{AdBanner, AdCapability, AdUnavailableReason};
pub use app::MemoApp;
pub use config::{AdConfig, ConfigError, CoreConfig};
pub use error::{MemoError, MemoResult, PreconditionError, UserAlert};
pub use identity::{
    bootstrap_session, IdentityError, IdentityProvider, SessionEvent, SqliteIdentityProvider,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::memo::{
    Memo, MemoId, MemoPatch, NewMemo, SessionId, DEFAULT_MEMO_COLOR, MEMO_COLOR_PALETTE,
};
pub use navigation::{DetailTarget, Route, RouteError};
pub use projection::grouping::{project_list, GroupCard, GroupDisplayMode, ListItem, MemoCard};
pub use repo::memo_repo::{GroupOption, MemoRepository, SaveOutcome};
pub use service::detail_service::DetailEditor;
pub use service::entry_service::{EntryComposer, GroupChoice, Submission};
pub use service::list_service::MemoListView;
pub use store::sqlite_store::SqliteMemoStore;
pub use store::{
    ConditionalWrite, MemoSnapshot, RemoteStore, StoreError, StoreResult, Subscription,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
