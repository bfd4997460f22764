//! Registry of in-flight requests.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::cache::RequestKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingStats {
    pub pending_count: usize,
    pub pending_keys: Vec<RequestKey>,
}

/// Outcome of [`PendingTable::join_or_insert`].
#[derive(Debug)]
pub enum Slot<F> {
    /// A call for the key was already in flight.
    Joined(F),
    /// The candidate was registered under `id`.
    Inserted { id: u64, outcome: F },
}

struct Registration<F> {
    id: u64,
    outcome: F,
}

/// Key → shared in-flight outcome.
///
/// `F` is a cloneable handle on the outcome (a `Shared` future in the manager). Each
/// registration carries an id so a settling call only removes its own entry, never one
/// registered after an administrative [`clear`](PendingTable::clear).
pub struct PendingTable<F> {
    entries: Mutex<BTreeMap<RequestKey, Registration<F>>>,
    next_id: AtomicU64,
}

impl<F: Clone> PendingTable<F> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn has(&self, key: &RequestKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn get(&self, key: &RequestKey) -> Option<F> {
        self.entries.lock().get(key).map(|r| r.outcome.clone())
    }

    /// Register `outcome`, silently replacing any existing registration. Returns its id.
    pub fn set(&self, key: RequestKey, outcome: F) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().insert(key, Registration { id, outcome });
        id
    }

    /// Return the in-flight outcome for `key`, or register `candidate` if there is none.
    ///
    /// The check and the registration happen under one lock, so two callers can never
    /// both register for the same key.
    pub fn join_or_insert(&self, key: RequestKey, candidate: F) -> Slot<F> {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&key) {
            return Slot::Joined(existing.outcome.clone());
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        entries.insert(
            key,
            Registration {
                id,
                outcome: candidate.clone(),
            },
        );
        Slot::Inserted {
            id,
            outcome: candidate,
        }
    }

    pub fn delete(&self, key: &RequestKey) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Remove the registration for `key` only if it is still registration `id`.
    pub fn release(&self, key: &RequestKey, id: u64) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(registration) if registration.id == id => {
                entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Forget every registration. Calls already in flight still settle for the callers
    /// awaiting them; new callers simply stop joining them.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> PendingStats {
        let entries = self.entries.lock();
        PendingStats {
            pending_count: entries.len(),
            pending_keys: entries.keys().cloned().collect(),
        }
    }
}

impl<F: Clone> Default for PendingTable<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::{FutureExt, Shared};
    use futures::future::BoxFuture;

    fn key(s: &str) -> RequestKey {
        RequestKey::from(s)
    }

    #[test]
    fn test_join_or_insert_registers_once() {
        let table = PendingTable::new();
        let first = table.join_or_insert(key("k"), 1u32);
        let second = table.join_or_insert(key("k"), 2u32);
        assert!(matches!(first, Slot::Inserted { outcome: 1, .. }));
        assert!(matches!(second, Slot::Joined(1)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_release_only_removes_own_registration() {
        let table = PendingTable::new();
        let Slot::Inserted { id: old, .. } = table.join_or_insert(key("k"), "old") else {
            panic!("expected insert");
        };
        table.clear();
        let new = table.set(key("k"), "new");
        assert!(!table.release(&key("k"), old));
        assert_eq!(table.get(&key("k")), Some("new"));
        assert!(table.release(&key("k"), new));
        assert!(!table.has(&key("k")));
    }

    #[test]
    fn test_set_overwrites_and_delete_reports_presence() {
        let table = PendingTable::new();
        table.set(key("k"), 1);
        table.set(key("k"), 2);
        assert_eq!(table.get(&key("k")), Some(2));
        assert!(table.delete(&key("k")));
        assert!(!table.delete(&key("k")));
    }

    #[test]
    fn test_stats() {
        let table = PendingTable::new();
        table.set(key("b"), ());
        table.set(key("a"), ());
        let stats = table.stats();
        assert_eq!(stats.pending_count, 2);
        assert_eq!(stats.pending_keys, vec![key("a"), key("b")]);
    }

    #[tokio::test]
    async fn test_clear_does_not_affect_awaiting_callers() {
        let table: PendingTable<Shared<BoxFuture<'static, u32>>> = PendingTable::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<u32>();
        let shared = rx.map(|r| r.unwrap_or(0)).boxed().shared();
        table.set(key("k"), shared);
        let joined = table.get(&key("k")).unwrap();
        table.clear();
        tx.send(42).unwrap();
        assert_eq!(joined.await, 42);
        assert!(table.is_empty());
    }
}
