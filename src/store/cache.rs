//! LRU read-through cache with optional per-entry TTL

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::metrics::CacheCounters;
use crate::store::record::Record;

#[derive(Debug)]
struct CachedRecord {
    record: Record,
    stored_at: Instant,
}

/// Bounded cache of record copies.
///
/// Holds nothing the backing map doesn't: the store writes through it on
/// every mutation and drops entries on removal.
#[derive(Debug)]
pub struct RecordCache {
    entries: LruCache<String, CachedRecord>,
    ttl: Option<Duration>,
    counters: CacheCounters,
}

impl RecordCache {
    pub fn new(capacity: NonZeroUsize, ttl: Option<Duration>) -> Self {
        Self {
            entries: LruCache::new(capacity),
            ttl,
            counters: CacheCounters::default(),
        }
    }

    /// Look up a record, refreshing its recency. An expired entry is evicted
    /// and reported as a miss.
    pub fn get(&mut self, id: &str) -> Option<Record> {
        let expired = match self.entries.get(id) {
            None => {
                self.counters.record_miss();
                return None;
            }
            Some(cached) => self.ttl.is_some_and(|ttl| cached.stored_at.elapsed() > ttl),
        };

        if expired {
            self.entries.pop(id);
            self.counters.record_miss();
            tracing::trace!(id, "cache entry expired");
            return None;
        }

        self.counters.record_hit();
        self.entries.peek(id).map(|cached| cached.record.clone())
    }

    /// Insert or refresh a record, evicting the least recently used entry
    /// when the cache is full.
    pub fn put(&mut self, record: Record) {
        let id = record.id.clone();
        let cached = CachedRecord {
            record,
            stored_at: Instant::now(),
        };

        if let Some((evicted, _)) = self.entries.push(id.clone(), cached) {
            if evicted != id {
                tracing::trace!(evicted = %evicted, "cache evicted least recently used");
            }
        }
    }

    pub fn invalidate(&mut self, id: &str) {
        self.entries.pop(id);
    }

    #[cfg(test)]
    fn contains(&self, id: &str) -> bool {
        self.entries.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn counters(&self) -> CacheCounters {
        self.counters
    }
}
