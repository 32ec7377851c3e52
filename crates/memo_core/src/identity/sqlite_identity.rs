//! SQLite-persisted anonymous identity provider.

use crate::db::{open_db, open_db_in_memory};
use crate::identity::{
    IdentityError, IdentityProvider, IdentityResult, SessionEvent, SessionListener,
};
use crate::model::memo::SessionId;
use crate::store::live::ListenerSet;
use crate::store::Subscription;
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Identity provider keeping one anonymous session in `session_identity`.
pub struct SqliteIdentityProvider {
    conn: Mutex<Connection>,
    current: Mutex<Option<SessionId>>,
    listeners: ListenerSet<(), SessionEvent>,
}

impl SqliteIdentityProvider {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            current: Mutex::new(None),
            listeners: ListenerSet::new(),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> IdentityResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> IdentityResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    fn conn(&self) -> IdentityResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| IdentityError::Unavailable("connection lock poisoned".to_string()))
    }

    fn current(&self) -> MutexGuard<'_, Option<SessionId>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, next: Option<SessionId>, event: SessionEvent) {
        *self.current() = next;
        info!(
            "event=session_change module=identity status=ok transition={}",
            transition_name(&event)
        );
        for (_, delivery) in self.listeners.matching(|_| true) {
            delivery.deliver(event.clone());
        }
    }
}

fn transition_name(event: &SessionEvent) -> &'static str {
    match event {
        SessionEvent::Restored(_) => "restored",
        SessionEvent::SignedIn(_) => "signed_in",
        SessionEvent::SignedOut => "signed_out",
    }
}

impl IdentityProvider for SqliteIdentityProvider {
    fn current_session(&self) -> Option<SessionId> {
        self.current().clone()
    }

    fn restore_session(&self) -> IdentityResult<Option<SessionId>> {
        let stored: Option<String> = self
            .conn()?
            .query_row(
                "SELECT session_id FROM session_identity WHERE slot = 1;",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let Some(stored) = stored else {
            return Ok(None);
        };
        let session = SessionId::new(stored);
        self.transition(Some(session.clone()), SessionEvent::Restored(session.clone()));
        Ok(Some(session))
    }

    fn sign_in_anonymously(&self) -> IdentityResult<SessionId> {
        let session = SessionId::new(Uuid::new_v4().to_string());
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or_default();
        self.conn()?.execute(
            "INSERT INTO session_identity (slot, session_id, created_at)
             VALUES (1, ?1, ?2)
             ON CONFLICT(slot) DO UPDATE SET
                session_id = excluded.session_id,
                created_at = excluded.created_at;",
            params![session.as_str(), created_at],
        )?;

        self.transition(Some(session.clone()), SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    fn sign_out(&self) -> IdentityResult<()> {
        self.conn()?
            .execute("DELETE FROM session_identity WHERE slot = 1;", [])?;
        self.transition(None, SessionEvent::SignedOut);
        Ok(())
    }

    fn on_session_change(&self, listener: SessionListener) -> Subscription {
        let (subscription, delivery) = self.listeners.register((), listener);
        if let Some(current) = self.current_session() {
            delivery.deliver(SessionEvent::Restored(current));
        }
        subscription
    }
}
