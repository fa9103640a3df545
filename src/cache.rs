//! # TTL Cache
//! Process-wide key/value store with per-entry expiry, used to avoid
//! redundant upstream calls. Entries are evicted lazily: a `get` that finds a
//! stale entry removes it and reports absence.
//!
//! There is no size bound and no LRU; unbounded growth is accepted for a
//! single-process deployment. Concurrent `get_or_set` callers for the same
//! key each invoke the producer (no single-flight); the map itself is
//! mutex-guarded so the multi-threaded runtime cannot interleave within one
//! operation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default entry lifetime when the caller does not pick one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct Entry<T> {
    payload: T,
    expires_at_ms: u64,
}

/// Thread-safe in-memory cache with absolute-TTL expiry (no sliding refresh).
///
/// The `*_at` variants take an explicit `now_ms` so tests can simulate the
/// clock; the plain variants use wall time.
#[derive(Debug)]
pub struct TtlCache<T> {
    inner: Mutex<HashMap<String, Entry<T>>>,
    default_ttl: Duration,
}

impl<T: Clone> Default for TtlCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<T: Clone> TtlCache<T> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Stored payload if present and not expired.
    pub fn get(&self, key: &str) -> Option<T> {
        self.get_at(key, now_ms())
    }

    /// Clock-explicit variant of [`get`](Self::get). Evicts a stale entry as
    /// a side effect.
    pub fn get_at(&self, key: &str, now_ms: u64) -> Option<T> {
        let mut map = self.inner.lock().expect("cache mutex poisoned");
        match map.get(key) {
            Some(entry) if now_ms < entry.expires_at_ms => Some(entry.payload.clone()),
            Some(_) => {
                map.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store with the default TTL, overwriting unconditionally.
    pub fn set(&self, key: &str, payload: T) {
        self.set_at(key, payload, self.default_ttl, now_ms());
    }

    /// Store with an explicit TTL, overwriting unconditionally.
    pub fn set_with_ttl(&self, key: &str, payload: T, ttl: Duration) {
        self.set_at(key, payload, ttl, now_ms());
    }

    /// Clock-explicit variant of [`set_with_ttl`](Self::set_with_ttl).
    pub fn set_at(&self, key: &str, payload: T, ttl: Duration, now_ms: u64) {
        let entry = Entry {
            payload,
            expires_at_ms: now_ms.saturating_add(ttl.as_millis() as u64),
        };
        let mut map = self.inner.lock().expect("cache mutex poisoned");
        map.insert(key.to_string(), entry);
    }

    /// Cached payload if valid, otherwise run the async producer, store its
    /// result with the default TTL, and return it.
    pub async fn get_or_set<F, Fut>(&self, key: &str, producer: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.get_or_set_with_ttl(key, producer, self.default_ttl).await
    }

    /// [`get_or_set`](Self::get_or_set) with an explicit TTL.
    pub async fn get_or_set_with_ttl<F, Fut>(&self, key: &str, producer: F, ttl: Duration) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(hit) = self.get(key) {
            return hit;
        }
        let produced = producer().await;
        self.set_with_ttl(key, produced.clone(), ttl);
        produced
    }

    pub fn remove(&self, key: &str) {
        let mut map = self.inner.lock().expect("cache mutex poisoned");
        map.remove(key);
    }

    pub fn clear(&self) {
        let mut map = self.inner.lock().expect("cache mutex poisoned");
        map.clear();
    }

    /// Number of entries, expired or not (expired entries linger until read).
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Current UNIX time in milliseconds.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_within_ttl() {
        let cache: TtlCache<String> = TtlCache::new(Duration::from_secs(60));
        cache.set_at("k", "v".to_string(), Duration::from_secs(60), 1_000);
        assert_eq!(cache.get_at("k", 1_500), Some("v".to_string()));
    }

    #[test]
    fn absent_after_ttl_elapsed() {
        let cache: TtlCache<String> = TtlCache::new(Duration::from_secs(60));
        cache.set_at("k", "v".to_string(), Duration::from_millis(500), 1_000);
        assert_eq!(cache.get_at("k", 1_499), Some("v".to_string()));
        assert_eq!(cache.get_at("k", 1_500), None, "expiry is exclusive");
        // Stale read evicted the entry.
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn set_overwrites_unconditionally() {
        let cache: TtlCache<i32> = TtlCache::default();
        cache.set_at("k", 1, Duration::from_secs(10), 0);
        cache.set_at("k", 2, Duration::from_secs(10), 0);
        assert_eq!(cache.get_at("k", 1), Some(2));
    }

    #[test]
    fn remove_and_clear() {
        let cache: TtlCache<i32> = TtlCache::default();
        cache.set("a", 1);
        cache.set("b", 2);
        cache.remove("a");
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn get_or_set_invokes_producer_once_per_miss() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        let v1 = cache
            .get_or_set("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                7
            })
            .await;
        let v2 = cache
            .get_or_set("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                8
            })
            .await;

        assert_eq!(v1, 7);
        assert_eq!(v2, 7, "second call should hit the cache");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
