#![allow(dead_code)]

use memo_core::store::SnapshotConsumer;
use memo_core::{
    ConditionalWrite, Memo, MemoId, MemoPatch, NewMemo, RemoteStore, SessionId, SqliteMemoStore,
    StoreError, StoreResult, Subscription,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

/// In-memory store that counts writes and can stall or sabotage them.
pub struct CountingStore {
    inner: SqliteMemoStore,
    creates: AtomicUsize,
    updates: AtomicUsize,
    replaces: AtomicUsize,
    deletes: AtomicUsize,
    fail_deletes: AtomicBool,
    create_gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
    interfering_text: Mutex<Option<String>>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteMemoStore::open_in_memory().unwrap(),
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            replaces: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            fail_deletes: AtomicBool::new(false),
            create_gate: Mutex::new(None),
            interfering_text: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &SqliteMemoStore {
        &self.inner
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn replaces(&self) -> usize {
        self.replaces.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.creates() + self.updates() + self.replaces() + self.deletes()
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Blocks the next `create_memo` until the returned sender fires.
    ///
    /// The returned receiver yields once the create has started.
    pub fn hold_next_create(&self) -> (Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = channel();
        let (release_tx, release_rx) = channel();
        *self.create_gate.lock().unwrap() = Some((entered_tx, release_rx));
        (entered_rx, release_tx)
    }

    /// Makes another writer change the text right before the next
    /// conditional write.
    pub fn interfere_with_next_replace(&self, text: &str) {
        *self.interfering_text.lock().unwrap() = Some(text.to_string());
    }

    /// Seeds a memo directly, bypassing the counters.
    pub fn seed(&self, text: &str, group: &str, owner: &str, color: Option<&str>) -> Memo {
        let memo = NewMemo::new(
            text,
            group,
            SessionId::from(owner),
            color.map(str::to_string),
        )
        .unwrap();
        self.inner.create_memo(&memo).unwrap()
    }
}

impl RemoteStore for CountingStore {
    fn create_memo(&self, memo: &NewMemo) -> StoreResult<Memo> {
        let gate = self.create_gate.lock().unwrap().take();
        if let Some((entered, release)) = gate {
            entered.send(()).unwrap();
            release.recv().unwrap();
        }
        let created = self.inner.create_memo(memo)?;
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    fn get_memo(&self, id: &MemoId) -> StoreResult<Option<Memo>> {
        self.inner.get_memo(id)
    }

    fn update_memo(&self, id: &MemoId, owner: &SessionId, patch: &MemoPatch) -> StoreResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_memo(id, owner, patch)
    }

    fn replace_text_if(
        &self,
        id: &MemoId,
        expected: &str,
        next: &str,
    ) -> StoreResult<ConditionalWrite> {
        let interfering = self.interfering_text.lock().unwrap().take();
        if let Some(text) = interfering {
            self.inner.replace_text_if(id, expected, &text)?;
        }
        self.replaces.fetch_add(1, Ordering::SeqCst);
        self.inner.replace_text_if(id, expected, next)
    }

    fn delete_memo(&self, id: &MemoId, owner: &SessionId) -> StoreResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("network down".to_string()));
        }
        self.inner.delete_memo(id, owner)
    }

    fn list_memos(&self, owner: &SessionId) -> StoreResult<Vec<Memo>> {
        self.inner.list_memos(owner)
    }

    fn subscribe(
        &self,
        owner: &SessionId,
        consumer: SnapshotConsumer,
    ) -> StoreResult<Subscription> {
        self.inner.subscribe(owner, consumer)
    }
}
