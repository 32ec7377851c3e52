//! Anonymous session identity.
//!
//! # Responsibility
//! - Define the identity provider contract consumed by the app context.
//! - Bootstrap a session: prefer a restored one, create only when none exists.
//!
//! # Invariants
//! - At most one session is current per provider.
//! - Every transition (restored, signed in, signed out) is pushed to
//!   registered listeners.

use crate::db::DbError;
use crate::model::memo::SessionId;
use crate::store::live::Listener;
use crate::store::Subscription;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod sqlite_identity;

pub use sqlite_identity::SqliteIdentityProvider;

pub type IdentityResult<T> = Result<T, IdentityError>;

/// Session state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A persisted session from an earlier run became current.
    Restored(SessionId),
    /// A fresh anonymous session was created.
    SignedIn(SessionId),
    SignedOut,
}

impl SessionEvent {
    /// Session that is current after this transition.
    pub fn session(&self) -> Option<&SessionId> {
        match self {
            Self::Restored(id) | Self::SignedIn(id) => Some(id),
            Self::SignedOut => None,
        }
    }
}

pub type SessionListener = Listener<SessionEvent>;

#[derive(Debug)]
pub enum IdentityError {
    Db(DbError),
    Unavailable(String),
}

impl Display for IdentityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Unavailable(message) => write!(f, "identity provider unavailable: {message}"),
        }
    }
}

impl Error for IdentityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for IdentityError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for IdentityError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Issues anonymous session identities.
pub trait IdentityProvider: Send + Sync {
    /// Current session, without touching storage.
    fn current_session(&self) -> Option<SessionId>;
    /// Loads a persisted session and makes it current.
    fn restore_session(&self) -> IdentityResult<Option<SessionId>>;
    /// Creates and persists a new anonymous session.
    fn sign_in_anonymously(&self) -> IdentityResult<SessionId>;
    fn sign_out(&self) -> IdentityResult<()>;
    /// Registers a transition listener.
    ///
    /// When a session is already current the listener immediately receives
    /// `Restored` with it.
    fn on_session_change(&self, listener: SessionListener) -> Subscription;
}

/// Returns the current session, restoring or creating one as needed.
///
/// A restored session always wins over creating a new one, so a restart keeps
/// the memos of the previous run visible.
pub fn bootstrap_session(provider: &dyn IdentityProvider) -> IdentityResult<SessionId> {
    if let Some(current) = provider.current_session() {
        return Ok(current);
    }

    if let Some(restored) = provider.restore_session()? {
        info!("event=session_bootstrap module=identity status=ok source=restored");
        return Ok(restored);
    }

    let created = provider.sign_in_anonymously()?;
    info!("event=session_bootstrap module=identity status=ok source=anonymous_sign_in");
    Ok(created)
}
