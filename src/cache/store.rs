//! Bounded, time-expiring response store.

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::key::RequestKey;

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    pub expires_at: Instant,
}

/// Expiry used when `created_at + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        let created_at = Instant::now();
        let expires_at = created_at
            .checked_add(ttl)
            .or_else(|| created_at.checked_add(FAR_FUTURE))
            .unwrap_or(created_at);
        Self {
            value,
            created_at,
            expires_at,
        }
    }

    fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    /// Keys in insertion order, oldest first.
    pub keys: Vec<RequestKey>,
}

/// Key → value store with per-entry expiry and insertion-order eviction.
///
/// Entries are never promoted on read, so the LRU end of the list is always the oldest
/// insertion. Overwriting a key counts as a fresh insertion.
pub struct CacheStore<V> {
    entries: Mutex<LruCache<RequestKey, CacheEntry<V>>>,
    max_size: usize,
    default_ttl: Duration,
}

impl<V: Clone> CacheStore<V> {
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::unbounded()),
            max_size: max_size.max(1),
            default_ttl,
        }
    }

    /// The stored value, unless it has expired; an expired entry is removed on the way.
    pub fn get(&self, key: &RequestKey) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.peek(key) {
            None => return None,
            Some(entry) if !entry.is_expired_at(now) => return Some(entry.value.clone()),
            Some(_) => {}
        }
        entries.pop(key);
        debug!(key = %key, "cache entry expired on read");
        None
    }

    /// Insert with `ttl`, or the store default when `ttl` is `None` or zero.
    pub fn set(&self, key: RequestKey, value: V, ttl: Option<Duration>) {
        let ttl = ttl.filter(|t| !t.is_zero()).unwrap_or(self.default_ttl);
        let mut entries = self.entries.lock();
        if !entries.contains(&key) && entries.len() >= self.max_size {
            if let Some((evicted, _)) = entries.pop_lru() {
                debug!(key = %evicted, "cache full, evicted oldest entry");
            }
        }
        entries.put(key, CacheEntry::new(value, ttl));
    }

    pub fn delete(&self, key: &RequestKey) -> bool {
        self.entries.lock().pop(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        CacheStats {
            size: entries.len(),
            max_size: self.max_size,
            keys: entries.iter().rev().map(|(k, _)| k.clone()).collect(),
        }
    }

    /// Remove every entry expired at call time and return how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let expired: Vec<RequestKey> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &RequestKey) -> bool {
        self.entries.lock().contains(key)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> RequestKey {
        RequestKey::from(s)
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_honours_ttl_and_removes_expired() {
        let store = CacheStore::new(10, Duration::from_secs(300));
        store.set(key("k1"), "v", Some(Duration::from_millis(1000)));

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(store.get(&key("k1")), Some("v"));

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert_eq!(store.get(&key("k1")), None);
        assert!(!store.contains(&key("k1")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_is_live_exactly_at_expiry() {
        let store = CacheStore::new(10, Duration::from_secs(300));
        store.set(key("k"), 1, Some(Duration::from_millis(1000)));
        tokio::time::advance(Duration::from_millis(1000)).await;
        assert_eq!(store.get(&key("k")), Some(1));
        assert_eq!(store.cleanup(), 0);
    }

    #[test]
    fn test_capacity_evicts_oldest_insertion() {
        let store = CacheStore::new(2, Duration::from_secs(60));
        store.set(key("k1"), 1, None);
        store.set(key("k2"), 2, None);
        // Reads do not refresh insertion order.
        assert_eq!(store.get(&key("k1")), Some(1));
        store.set(key("k3"), 3, None);

        let stats = store.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.max_size, 2);
        assert_eq!(stats.keys, vec![key("k2"), key("k3")]);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let store = CacheStore::new(2, Duration::from_secs(60));
        store.set(key("k1"), 1, None);
        store.set(key("k2"), 2, None);
        store.set(key("k1"), 10, None);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&key("k1")), Some(10));
        // The rewritten key is now the newest insertion.
        assert_eq!(store.stats().keys, vec![key("k2"), key("k1")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_uses_default() {
        let store = CacheStore::new(4, Duration::from_secs(60));
        store.set(key("k"), 1, Some(Duration::ZERO));
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(store.get(&key("k")), Some(1));
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(store.get(&key("k")), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_removes_only_expired() {
        let store = CacheStore::new(10, Duration::from_secs(60));
        store.set(key("short1"), 1, Some(Duration::from_millis(100)));
        store.set(key("long"), 2, Some(Duration::from_secs(10)));
        store.set(key("short2"), 3, Some(Duration::from_millis(200)));

        tokio::time::advance(Duration::from_millis(250)).await;
        assert_eq!(store.cleanup(), 2);
        assert_eq!(store.stats().keys, vec![key("long")]);
        assert_eq!(store.cleanup(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_saturates_instead_of_overflowing() {
        let store = CacheStore::new(4, Duration::from_secs(60));
        store.set(key("forever"), 1, Some(Duration::MAX));
        tokio::time::advance(Duration::from_secs(86_400 * 365)).await;
        assert_eq!(store.get(&key("forever")), Some(1));
        assert_eq!(store.cleanup(), 0);
    }

    #[test]
    fn test_delete_and_clear() {
        let store = CacheStore::new(10, Duration::from_secs(60));
        store.set(key("a"), 1, None);
        store.set(key("b"), 2, None);
        assert!(store.delete(&key("a")));
        assert!(!store.delete(&key("a")));
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let store = CacheStore::new(0, Duration::from_secs(60));
        store.set(key("a"), 1, None);
        store.set(key("b"), 2, None);
        assert_eq!(store.max_size(), 1);
        assert_eq!(store.stats().keys, vec![key("b")]);
    }
}
