//! Database file bootstrap for memos and the persisted session.
//!
//! # Responsibility
//! - Open the SQLite file (or an in-memory database) shared by the document
//!   store and the identity provider.
//! - Bring its schema up to the version this build ships.
//!
//! # Errors
//! - `Sqlite`: the file cannot be opened, configured or migrated.
//! - `SchemaTooNew`: the file was written by a newer build; it is left
//!   untouched.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "memo database error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "memo database schema v{found} was written by a newer build (supports up to v{supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
