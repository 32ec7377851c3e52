//! Remote document store contract and implementations.
//!
//! # Responsibility
//! - Define the `RemoteStore` seam every backend implements.
//! - Define live-query snapshots and conditional write outcomes.
//!
//! # Invariants
//! - Owner-filtered reads only return documents whose `userId` equals the
//!   requested owner, ordered by `createdAt` descending.
//! - Every committed write re-delivers full snapshots to the affected owner's
//!   live subscriptions; snapshots are never deltas.
//! - Snapshot `version` grows monotonically per store instance.

use crate::db::DbError;
use crate::model::memo::{Memo, MemoId, MemoPatch, NewMemo, SessionId};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod live;
pub mod sqlite_store;

pub use live::Subscription;

pub type StoreResult<T> = Result<T, StoreError>;

/// Full result set of one owner-filtered live query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoSnapshot {
    pub owner: SessionId,
    /// Monotonic per store; later snapshots carry larger versions.
    pub version: u64,
    /// Ordered by `created_at` descending.
    pub memos: Vec<Memo>,
}

/// Consumer invoked with every snapshot of a live query.
pub type SnapshotConsumer = Arc<dyn Fn(MemoSnapshot) + Send + Sync>;

/// Outcome of a compare-and-set text write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalWrite {
    Applied,
    /// The document no longer exists.
    Missing,
    /// The stored text differs from the expected value.
    Conflict { current_text: String },
}

/// Storage/transport error for store operations.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    NotFound(MemoId),
    /// Document exists but belongs to another owner.
    PermissionDenied(MemoId),
    InvalidData(String),
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "memo not found: {id}"),
            Self::PermissionDenied(id) => write!(f, "memo is owned by another session: {id}"),
            Self::InvalidData(message) => write!(f, "invalid stored document: {message}"),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// Document store holding the `memos` collection.
///
/// Implementations must be shareable across threads: bulk deletes fan out
/// concurrently against one store.
pub trait RemoteStore: Send + Sync {
    /// Creates one memo; the store assigns id and `created_at`.
    fn create_memo(&self, memo: &NewMemo) -> StoreResult<Memo>;
    /// Direct fetch by id. Not owner-filtered.
    fn get_memo(&self, id: &MemoId) -> StoreResult<Option<Memo>>;
    /// Replaces text/group/color when the memo exists and belongs to `owner`.
    fn update_memo(&self, id: &MemoId, owner: &SessionId, patch: &MemoPatch) -> StoreResult<()>;
    /// Writes `next` only if the stored text still equals `expected`.
    fn replace_text_if(
        &self,
        id: &MemoId,
        expected: &str,
        next: &str,
    ) -> StoreResult<ConditionalWrite>;
    /// Hard-deletes one memo owned by `owner`. Deleting a missing memo succeeds.
    fn delete_memo(&self, id: &MemoId, owner: &SessionId) -> StoreResult<()>;
    /// One-shot owner-filtered query, `created_at` descending.
    fn list_memos(&self, owner: &SessionId) -> StoreResult<Vec<Memo>>;
    /// Opens a live owner-filtered query.
    ///
    /// The consumer receives the current result set before this returns and a
    /// full snapshot after every later change to the owner's memos.
    fn subscribe(
        &self,
        owner: &SessionId,
        consumer: SnapshotConsumer,
    ) -> StoreResult<Subscription>;
}
