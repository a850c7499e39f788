//! Range-result caching layer for any [`RankedIndex`].
//!
//! Repeated range queries over an unchanged index are answered from an LRU of
//! previous results. Every write clears the cache, so a cached answer always
//! equals what the wrapped index would return.

use std::cell::RefCell;
use std::num::NonZeroUsize;

use lru::LruCache;

use crate::entry::Entry;
use crate::error::Result;
use crate::index::RankedIndex;
use crate::metrics::CacheCounters;

/// Cache key: the exact bit patterns of `(min, max)`.
type RangeKey = (u64, u64);

#[derive(Debug)]
struct RangeCache {
    results: LruCache<RangeKey, Vec<Entry>>,
    counters: CacheCounters,
}

/// A [`RankedIndex`] decorator that memoises `range` results.
#[derive(Debug)]
pub struct CachedIndex<I: RankedIndex> {
    inner: I,
    cache: RefCell<RangeCache>,
}

impl<I: RankedIndex> CachedIndex<I> {
    /// Wrap `inner`, remembering at most `capacity` distinct ranges.
    pub fn new(inner: I, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            cache: RefCell::new(RangeCache {
                results: LruCache::new(capacity),
                counters: CacheCounters::default(),
            }),
        }
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    pub fn counters(&self) -> CacheCounters {
        self.cache.borrow().counters
    }

    /// Number of ranges currently memoised.
    pub fn cached_ranges(&self) -> usize {
        self.cache.borrow().results.len()
    }

    fn invalidate(&self) {
        let mut cache = self.cache.borrow_mut();
        if !cache.results.is_empty() {
            tracing::trace!(ranges = cache.results.len(), "range cache invalidated");
            cache.results.clear();
        }
    }
}

impl<I: RankedIndex> RankedIndex for CachedIndex<I> {
    fn insert(&mut self, id: &str, metric: f64) -> Result<()> {
        self.inner.insert(id, metric)?;
        self.invalidate();
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Option<f64> {
        let removed = self.inner.remove(id)?;
        self.invalidate();
        Some(removed)
    }

    fn get(&self, id: &str) -> Option<f64> {
        self.inner.get(id)
    }

    fn range(&self, min: f64, max: f64) -> Vec<Entry> {
        let key = (min.to_bits(), max.to_bits());
        let mut cache = self.cache.borrow_mut();

        if let Some(hit) = cache.results.get(&key).cloned() {
            cache.counters.record_hit();
            return hit;
        }

        cache.counters.record_miss();
        let result = self.inner.range(min, max);
        cache.results.put(key, result.clone());
        result
    }

    fn sorted(&self) -> Vec<Entry> {
        self.inner.sorted()
    }

    fn rank(&self, value: f64) -> usize {
        self.inner.rank(value)
    }

    fn kth_smallest(&self, k: usize) -> Option<Entry> {
        self.inner.kth_smallest(k)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
