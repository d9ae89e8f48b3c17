//! In-process LRU+TTL cache for bridge-discovery results, fronting the
//! slower metadata-store-backed cache. Grounded in the teacher's
//! `retrieval::cache::lru::QueryCache` shape: an `lru::LruCache` guarded by
//! a lock, paired with a small metrics struct.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::RwLock;

use crate::metastore::BridgeCacheEntry;

const DEFAULT_CAPACITY: usize = 256;

struct Entry {
    bridges: Vec<BridgeCacheEntry>,
    cached_at: Instant,
}

/// Hit/miss counters for observability.
#[derive(Debug, Clone, Copy, Default)]
pub struct BridgeCacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Caches bridge-discovery output keyed by query fingerprint, with a fixed
/// TTL per entry (default 5 minutes, per `SPEC_FULL.md` §4.7).
pub struct BridgeCache {
    entries: RwLock<LruCache<String, Entry>>,
    metrics: RwLock<BridgeCacheMetrics>,
    ttl: Duration,
}

impl BridgeCache {
    /// Build a cache with the default capacity and TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, ttl)
    }

    /// Build a cache with an explicit entry capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(NonZeroUsize::new(capacity.max(1)).unwrap())),
            metrics: RwLock::new(BridgeCacheMetrics::default()),
            ttl,
        }
    }

    /// Look up a fingerprint, returning `None` on miss or expiry.
    pub fn get(&self, fingerprint: &str) -> Option<Vec<BridgeCacheEntry>> {
        let mut entries = self.entries.write();
        match entries.get(fingerprint) {
            Some(entry) if entry.cached_at.elapsed() < self.ttl => {
                self.metrics.write().hits += 1;
                Some(entry.bridges.clone())
            }
            Some(_) => {
                entries.pop(fingerprint);
                let mut metrics = self.metrics.write();
                metrics.misses += 1;
                metrics.evictions += 1;
                None
            }
            None => {
                self.metrics.write().misses += 1;
                None
            }
        }
    }

    /// Store bridge results for a fingerprint, replacing any prior entry.
    pub fn put(&self, fingerprint: String, bridges: Vec<BridgeCacheEntry>) {
        self.entries.write().put(fingerprint, Entry { bridges, cached_at: Instant::now() });
    }

    /// Current hit/miss/eviction counters.
    #[must_use]
    pub fn metrics(&self) -> BridgeCacheMetrics {
        *self.metrics.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_entry() -> BridgeCacheEntry {
        BridgeCacheEntry {
            query_fingerprint: "fp".into(),
            memory_id: Uuid::new_v4(),
            bridge_score: 0.5,
            novelty_score: 0.5,
            connection_potential: 0.5,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn miss_then_hit_after_put() {
        let cache = BridgeCache::new(Duration::from_secs(300));
        assert!(cache.get("fp").is_none());
        cache.put("fp".into(), vec![sample_entry()]);
        assert!(cache.get("fp").is_some());
        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
    }

    #[test]
    fn expired_entry_is_treated_as_a_miss() {
        let cache = BridgeCache::new(Duration::from_millis(1));
        cache.put("fp".into(), vec![sample_entry()]);
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get("fp").is_none());
    }
}
