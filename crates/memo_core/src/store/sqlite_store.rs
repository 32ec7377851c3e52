//! SQLite-backed document store for the `memos` collection.
//!
//! # Responsibility
//! - Persist memo documents as JSON bodies in the `documents` table.
//! - Serve owner-filtered, `createdAt`-descending queries.
//! - Push full snapshots to live subscriptions after every committed write.
//!
//! # Invariants
//! - `createdAt` is assigned here and strictly increases within a collection.
//! - Writes run inside `IMMEDIATE` transactions; conditional writes compare
//!   and swap under the same transaction.
//! - Subscribers are invoked after the connection lock is released.
//! - Memo text is never written to logs.

use crate::db::{open_db, open_db_in_memory};
use crate::model::memo::{
    Memo, MemoDocument, MemoId, MemoPatch, NewMemo, SessionId, MEMO_COLLECTION,
};
use crate::store::live::{Delivery, ListenerSet};
use crate::store::{
    ConditionalWrite, MemoSnapshot, RemoteStore, SnapshotConsumer, StoreError, StoreResult,
    Subscription,
};
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const MEMO_SELECT_BY_OWNER_SQL: &str = "SELECT doc_id, body
FROM documents
WHERE collection = ?1
  AND json_extract(body, '$.userId') = ?2
ORDER BY json_extract(body, '$.createdAt') DESC, seq DESC;";

type PendingDelivery = (Delivery<MemoSnapshot>, MemoSnapshot);

/// Document store over one SQLite connection.
pub struct SqliteMemoStore {
    conn: Mutex<Connection>,
    subscribers: ListenerSet<SessionId, MemoSnapshot>,
    next_version: AtomicU64,
}

impl SqliteMemoStore {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `InvalidData` when the `documents` table is missing.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_documents_table(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            subscribers: ListenerSet::new(),
            next_version: AtomicU64::new(1),
        })
    }

    /// Opens (and migrates) a file-backed store.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens an empty in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Number of live subscriptions currently registered.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn with_conn<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))?;
        op(&mut conn)
    }

    fn bump_version(&self) -> u64 {
        self.next_version.fetch_add(1, Ordering::SeqCst)
    }

    /// Builds snapshots for every subscription of `owner`.
    ///
    /// Must run while the connection lock is held so versions follow commit
    /// order. A failed re-query is logged, not returned: the write already
    /// committed.
    fn collect_snapshots(&self, conn: &Connection, owner: &SessionId) -> Vec<PendingDelivery> {
        let targets = self.subscribers.matching(|key| key == owner);
        if targets.is_empty() {
            return Vec::new();
        }

        let memos = match query_memos_by_owner(conn, owner) {
            Ok(memos) => memos,
            Err(err) => {
                warn!(
                    "event=memo_snapshot module=store status=error owner={} error={}",
                    owner, err
                );
                return Vec::new();
            }
        };
        let version = self.bump_version();
        targets
            .into_iter()
            .map(|(key, delivery)| {
                (
                    delivery,
                    MemoSnapshot {
                        owner: key,
                        version,
                        memos: memos.clone(),
                    },
                )
            })
            .collect()
    }
}

fn dispatch(pending: Vec<PendingDelivery>) {
    for (delivery, snapshot) in pending {
        let version = snapshot.version;
        if !delivery.deliver(snapshot) {
            debug!(
                "event=memo_snapshot module=store status=dropped reason=cancelled version={}",
                version
            );
        }
    }
}

impl RemoteStore for SqliteMemoStore {
    fn create_memo(&self, memo: &NewMemo) -> StoreResult<Memo> {
        let (created, pending) = self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let created_at = next_server_timestamp(&tx)?;
            let id = MemoId::new(Uuid::new_v4().to_string());
            let document = MemoDocument {
                text: Some(memo.text.clone()),
                group_name: Some(memo.group_name.clone()),
                user_id: Some(memo.owner_id.as_str().to_string()),
                created_at: Some(created_at),
                color: memo.color.clone(),
            };
            tx.execute(
                "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3);",
                params![
                    MEMO_COLLECTION,
                    id.as_str(),
                    serde_json::to_string(&document)?
                ],
            )?;
            tx.commit()?;

            let created = Memo::from_document(id, document);
            let pending = self.collect_snapshots(conn, &created.owner_id);
            Ok((created, pending))
        })?;

        debug!(
            "event=memo_create module=store status=ok doc_id={} owner={}",
            created.id, created.owner_id
        );
        dispatch(pending);
        Ok(created)
    }

    fn get_memo(&self, id: &MemoId) -> StoreResult<Option<Memo>> {
        self.with_conn(|conn| {
            let body: Option<String> = conn
                .query_row(
                    "SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2;",
                    params![MEMO_COLLECTION, id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            body.map(|body| parse_memo(id.clone(), &body)).transpose()
        })
    }

    fn update_memo(&self, id: &MemoId, owner: &SessionId, patch: &MemoPatch) -> StoreResult<()> {
        let pending = self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut fields = load_fields(&tx, id)?.ok_or_else(|| StoreError::NotFound(id.clone()))?;
            if fields.get("userId").and_then(Value::as_str) != Some(owner.as_str()) {
                return Err(StoreError::PermissionDenied(id.clone()));
            }

            fields.insert("text".to_string(), Value::String(patch.text.clone()));
            fields.insert(
                "groupName".to_string(),
                Value::String(patch.group_name.clone()),
            );
            fields.insert("color".to_string(), Value::String(patch.color.clone()));
            store_fields(&tx, id, fields)?;
            tx.commit()?;

            Ok(self.collect_snapshots(conn, owner))
        })?;

        debug!(
            "event=memo_update module=store status=ok doc_id={} owner={}",
            id, owner
        );
        dispatch(pending);
        Ok(())
    }

    fn replace_text_if(
        &self,
        id: &MemoId,
        expected: &str,
        next: &str,
    ) -> StoreResult<ConditionalWrite> {
        let (outcome, pending) = self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(mut fields) = load_fields(&tx, id)? else {
                return Ok((ConditionalWrite::Missing, Vec::new()));
            };

            let current_text = fields
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if current_text != expected {
                return Ok((ConditionalWrite::Conflict { current_text }, Vec::new()));
            }

            let owner = SessionId::new(
                fields
                    .get("userId")
                    .and_then(Value::as_str)
                    .unwrap_or_default(),
            );
            fields.insert("text".to_string(), Value::String(next.to_string()));
            store_fields(&tx, id, fields)?;
            tx.commit()?;

            Ok((ConditionalWrite::Applied, self.collect_snapshots(conn, &owner)))
        })?;

        debug!(
            "event=memo_replace_text module=store status={} doc_id={}",
            conditional_status(&outcome),
            id
        );
        dispatch(pending);
        Ok(outcome)
    }

    fn delete_memo(&self, id: &MemoId, owner: &SessionId) -> StoreResult<()> {
        let pending = self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(fields) = load_fields(&tx, id)? else {
                return Ok(Vec::new());
            };
            if fields.get("userId").and_then(Value::as_str) != Some(owner.as_str()) {
                return Err(StoreError::PermissionDenied(id.clone()));
            }
            tx.execute(
                "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2;",
                params![MEMO_COLLECTION, id.as_str()],
            )?;
            tx.commit()?;

            Ok(self.collect_snapshots(conn, owner))
        })?;

        debug!(
            "event=memo_delete module=store status=ok doc_id={} owner={}",
            id, owner
        );
        dispatch(pending);
        Ok(())
    }

    fn list_memos(&self, owner: &SessionId) -> StoreResult<Vec<Memo>> {
        self.with_conn(|conn| query_memos_by_owner(conn, owner))
    }

    fn subscribe(
        &self,
        owner: &SessionId,
        consumer: SnapshotConsumer,
    ) -> StoreResult<Subscription> {
        let (subscription, initial) = self.with_conn(|conn| {
            let (subscription, delivery) = self.subscribers.register(owner.clone(), consumer);
            // On error the handle drops here and unregisters itself.
            let memos = query_memos_by_owner(conn, owner)?;
            let snapshot = MemoSnapshot {
                owner: owner.clone(),
                version: self.bump_version(),
                memos,
            };
            Ok((subscription, (delivery, snapshot)))
        })?;

        info!(
            "event=memo_subscribe module=store status=ok owner={} initial_count={}",
            owner,
            initial.1.memos.len()
        );
        dispatch(vec![initial]);
        Ok(subscription)
    }
}

fn conditional_status(outcome: &ConditionalWrite) -> &'static str {
    match outcome {
        ConditionalWrite::Applied => "applied",
        ConditionalWrite::Missing => "missing",
        ConditionalWrite::Conflict { .. } => "conflict",
    }
}

fn query_memos_by_owner(conn: &Connection, owner: &SessionId) -> StoreResult<Vec<Memo>> {
    let mut stmt = conn.prepare(MEMO_SELECT_BY_OWNER_SQL)?;
    let mut rows = stmt.query(params![MEMO_COLLECTION, owner.as_str()])?;
    let mut memos = Vec::new();
    while let Some(row) = rows.next()? {
        let doc_id: String = row.get("doc_id")?;
        let body: String = row.get("body")?;
        memos.push(parse_memo(MemoId::new(doc_id), &body)?);
    }
    Ok(memos)
}

fn parse_memo(id: MemoId, body: &str) -> StoreResult<Memo> {
    let document: MemoDocument = serde_json::from_str(body)
        .map_err(|err| StoreError::InvalidData(format!("document `{id}`: {err}")))?;
    Ok(Memo::from_document(id, document))
}

fn load_fields(tx: &Transaction<'_>, id: &MemoId) -> StoreResult<Option<Map<String, Value>>> {
    let body: Option<String> = tx
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2;",
            params![MEMO_COLLECTION, id.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    match body {
        None => Ok(None),
        Some(body) => match serde_json::from_str::<Value>(&body)? {
            Value::Object(fields) => Ok(Some(fields)),
            _ => Err(StoreError::InvalidData(format!(
                "document `{id}` body is not an object"
            ))),
        },
    }
}

fn store_fields(tx: &Transaction<'_>, id: &MemoId, fields: Map<String, Value>) -> StoreResult<()> {
    let body = serde_json::to_string(&Value::Object(fields))?;
    tx.execute(
        "UPDATE documents SET body = ?3 WHERE collection = ?1 AND doc_id = ?2;",
        params![MEMO_COLLECTION, id.as_str(), body],
    )?;
    Ok(())
}

/// Wall-clock milliseconds, bumped past the newest stored `createdAt`.
fn next_server_timestamp(tx: &Transaction<'_>) -> StoreResult<i64> {
    let latest: i64 = tx.query_row(
        "SELECT COALESCE(MAX(json_extract(body, '$.createdAt')), 0)
         FROM documents
         WHERE collection = ?1;",
        [MEMO_COLLECTION],
        |row| row.get(0),
    )?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default();
    Ok(now.max(latest.saturating_add(1)))
}

fn ensure_documents_table(conn: &Connection) -> StoreResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'documents'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(StoreError::InvalidData(
            "required table `documents` is missing; run migrations first".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{next_server_timestamp, SqliteMemoStore};
    use crate::model::memo::{NewMemo, SessionId};
    use crate::store::RemoteStore;
    use rusqlite::TransactionBehavior;

    #[test]
    fn server_timestamps_strictly_increase() {
        let store = SqliteMemoStore::open_in_memory().unwrap();
        let owner = SessionId::from("u1");
        let first = store
            .create_memo(&NewMemo::new("a", "", owner.clone(), None).unwrap())
            .unwrap();
        let second = store
            .create_memo(&NewMemo::new("b", "", owner, None).unwrap())
            .unwrap();
        assert!(second.created_at > first.created_at);

        store
            .with_conn(|conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let next = next_server_timestamp(&tx)?;
                assert!(next > second.created_at);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        assert!(SqliteMemoStore::try_new(conn).is_err());
    }
}
