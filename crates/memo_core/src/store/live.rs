//! Listener registry and cancellable subscription handles.
//!
//! # Responsibility
//! - Keep keyed push listeners (live queries, session observers).
//! - Hand out `Subscription` handles whose cancellation is explicit.
//!
//! # Invariants
//! - `Subscription::cancel` is idempotent and also runs on drop.
//! - A cancelled listener is never invoked again, even when a delivery was
//!   collected before the cancel raced in.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Push callback invoked with each event.
pub type Listener<E> = Arc<dyn Fn(E) + Send + Sync>;

trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

struct Entry<K, E> {
    key: K,
    active: Arc<AtomicBool>,
    listener: Listener<E>,
}

struct Registry<K, E> {
    next_id: AtomicU64,
    entries: Mutex<BTreeMap<u64, Entry<K, E>>>,
}

impl<K, E> Registry<K, E> {
    fn entries(&self) -> MutexGuard<'_, BTreeMap<u64, Entry<K, E>>> {
        // Entries stay consistent even if a holder panicked: every mutation
        // is a single insert/remove.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: Send + 'static, E: 'static> Detach for Registry<K, E> {
    fn detach(&self, id: u64) {
        self.entries().remove(&id);
    }
}

/// Handle owning one registered listener.
///
/// Dropping the handle cancels the listener.
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    registry: Weak<dyn Detach>,
}

impl Subscription {
    /// Stops delivery and releases the registration. Safe to call repeatedly.
    pub fn cancel(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            if let Some(registry) = self.registry.upgrade() {
                registry.detach(self.id);
            }
        }
    }

    /// Returns whether the listener may still receive events.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// One pending delivery to a registered listener.
pub struct Delivery<E> {
    active: Arc<AtomicBool>,
    listener: Listener<E>,
}

impl<E> Delivery<E> {
    /// Invokes the listener unless its subscription was cancelled.
    ///
    /// Returns `false` when the event was dropped.
    pub fn deliver(&self, event: E) -> bool {
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }
        (self.listener)(event);
        true
    }
}

/// Keyed set of push listeners.
pub struct ListenerSet<K, E> {
    registry: Arc<Registry<K, E>>,
}

impl<K, E> Default for ListenerSet<K, E> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(1),
                entries: Mutex::new(BTreeMap::new()),
            }),
        }
    }
}

impl<K: Clone + Send + 'static, E: 'static> ListenerSet<K, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener under `key`.
    ///
    /// Returns the owning handle plus a delivery for an optional initial push.
    pub fn register(&self, key: K, listener: Listener<E>) -> (Subscription, Delivery<E>) {
        let id = self.registry.next_id.fetch_add(1, Ordering::SeqCst);
        let active = Arc::new(AtomicBool::new(true));
        self.registry.entries().insert(
            id,
            Entry {
                key,
                active: Arc::clone(&active),
                listener: Arc::clone(&listener),
            },
        );

        let registry: Weak<dyn Detach> = {
            let weak: Weak<Registry<K, E>> = Arc::downgrade(&self.registry);
            weak
        };
        let subscription = Subscription {
            id,
            active: Arc::clone(&active),
            registry,
        };
        (subscription, Delivery { active, listener })
    }

    /// Collects deliveries for every active listener whose key matches.
    pub fn matching(&self, predicate: impl Fn(&K) -> bool) -> Vec<(K, Delivery<E>)> {
        self.registry
            .entries()
            .values()
            .filter(|entry| entry.active.load(Ordering::SeqCst) && predicate(&entry.key))
            .map(|entry| {
                (
                    entry.key.clone(),
                    Delivery {
                        active: Arc::clone(&entry.active),
                        listener: Arc::clone(&entry.listener),
                    },
                )
            })
            .collect()
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.registry.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::{Listener, ListenerSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_listener(counter: &Arc<AtomicUsize>) -> Listener<u32> {
        let counter = Arc::clone(counter);
        Arc::new(move |value: u32| {
            counter.fetch_add(value as usize, Ordering::SeqCst);
        })
    }

    #[test]
    fn matching_filters_by_key() {
        let set = ListenerSet::<String, u32>::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let (_a, _) = set.register("a".to_string(), counting_listener(&hits));
        let (_b, _) = set.register("b".to_string(), counting_listener(&hits));

        let targets = set.matching(|key| key == "a");
        assert_eq!(targets.len(), 1);
        for (_, delivery) in targets {
            assert!(delivery.deliver(3));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn cancel_is_idempotent_and_blocks_collected_deliveries() {
        let set = ListenerSet::<(), u32>::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let (subscription, _) = set.register((), counting_listener(&hits));
        let pending = set.matching(|_| true);

        subscription.cancel();
        subscription.cancel();

        assert!(!subscription.is_active());
        assert!(set.is_empty());
        for (_, delivery) in pending {
            assert!(!delivery.deliver(1));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropping_handle_releases_registration() {
        let set = ListenerSet::<(), u32>::new();
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let (_subscription, _) = set.register((), counting_listener(&hits));
            assert_eq!(set.len(), 1);
        }
        assert!(set.is_empty());
    }
}
