//! Indexed record store with a read-through cache.
//!
//! The backing map is the single source of truth. On top of it sit two
//! optional layers chosen by [`StoreConfig`]:
//!
//! - an LRU cache (bounded, optional TTL) consulted first by [`IndexedStore::get`]
//! - equality secondary indexes, plus derived ratio indexes
//!
//! Every mutation updates the map, the indexes and the cache together while
//! holding the store's single lock.

mod cache;
pub mod record;
mod secondary;

pub use record::{Attributes, IndexKey, Record, Value};

use cache::RecordCache;
use secondary::SecondaryIndexes;

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::StoreConfig;
use crate::metrics::{CacheCounters, OpMetrics};

/// Store and cache statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub records: usize,
    pub cached: usize,
    pub cache: CacheCounters,
    pub hit_rate: f64,
    pub lookups: u64,
    pub writes: u64,
    pub removals: u64,
    pub avg_lookup_latency_us: f64,
    pub p95_lookup_latency_us: f64,
}

#[derive(Debug)]
struct StoreState {
    records: HashMap<String, Record>,
    cache: Option<RecordCache>,
    indexes: SecondaryIndexes,
    metrics: OpMetrics,
}

impl StoreState {
    fn upsert(&mut self, record: Record) {
        if let Some(old) = self.records.get(&record.id) {
            self.indexes.remove(&record.id, &old.attributes);
        }
        self.indexes.add(&record.id, &record.attributes);

        if let Some(cache) = self.cache.as_mut() {
            cache.put(record.clone());
        }
        self.records.insert(record.id.clone(), record);
        self.metrics.record_writes(1);
    }

    /// Linear fallback for attributes without an index.
    fn scan(&self, matches: impl Fn(&Record) -> bool) -> HashSet<String> {
        self.records
            .values()
            .filter(|r| matches(r))
            .map(|r| r.id.clone())
            .collect()
    }
}

/// A thread-safe id -> record store with secondary indexes and an LRU cache.
///
/// All methods take `&self`; a single mutex serialises every operation.
#[derive(Debug)]
pub struct IndexedStore {
    state: Mutex<StoreState>,
}

impl IndexedStore {
    /// Create a store with default caching and no secondary indexes.
    pub fn new() -> Self {
        Self::with_config(&StoreConfig::default())
    }

    pub fn with_config(config: &StoreConfig) -> Self {
        let cache = NonZeroUsize::new(config.cache_size)
            .map(|capacity| RecordCache::new(capacity, config.cache_ttl()));

        Self {
            state: Mutex::new(StoreState {
                records: HashMap::new(),
                cache,
                indexes: SecondaryIndexes::new(config),
                metrics: OpMetrics::new(),
            }),
        }
    }

    /// Insert or fully replace the record for `id`.
    pub fn insert(&self, id: impl Into<String>, attributes: Attributes) {
        self.insert_record(Record {
            id: id.into(),
            attributes,
        });
    }

    pub fn insert_record(&self, record: Record) {
        let mut state = self.state.lock();
        tracing::trace!(id = %record.id, "insert record");
        state.upsert(record);
    }

    /// Insert or replace many records under one lock acquisition.
    pub fn insert_bulk(&self, records: impl IntoIterator<Item = Record>) -> usize {
        let mut state = self.state.lock();
        let mut count = 0;
        for record in records {
            state.upsert(record);
            count += 1;
        }
        tracing::debug!(count, "bulk insert");
        count
    }

    /// Fetch a copy of the record for `id`, consulting the cache first.
    pub fn get(&self, id: &str) -> Option<Record> {
        let start = Instant::now();
        let mut state = self.state.lock();

        let cached = state.cache.as_mut().and_then(|cache| cache.get(id));
        let result = match cached {
            Some(record) => Some(record),
            None => {
                let record = state.records.get(id).cloned();
                if let (Some(record), Some(cache)) = (&record, state.cache.as_mut()) {
                    cache.put(record.clone());
                }
                record
            }
        };

        state.metrics.record_lookup(start.elapsed());
        result
    }

    /// Fetch every present id among `ids`.
    pub fn get_bulk<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> HashMap<String, Record> {
        ids.into_iter()
            .filter_map(|id| self.get(id).map(|r| (id.to_string(), r)))
            .collect()
    }

    /// Merge `partial` into the existing record. Returns false if `id` is absent.
    pub fn update(&self, id: &str, partial: Attributes) -> bool {
        self.update_merged(id, partial).is_some()
    }

    /// Merge `partial` and return the merged attributes, read inside the same
    /// critical section. Not counted as a lookup.
    pub(crate) fn update_merged(&self, id: &str, partial: Attributes) -> Option<Attributes> {
        let mut state = self.state.lock();
        let state = &mut *state;

        let record = state.records.get_mut(id)?;

        state.indexes.remove(id, &record.attributes);
        record.attributes.extend(partial);
        state.indexes.add(id, &record.attributes);

        if let Some(cache) = state.cache.as_mut() {
            cache.put(record.clone());
        }
        state.metrics.record_writes(1);
        Some(record.attributes.clone())
    }

    /// Delete `id` from the map, the cache and every index. Returns whether
    /// it was present.
    pub fn remove(&self, id: &str) -> bool {
        let mut state = self.state.lock();
        let Some(old) = state.records.remove(id) else {
            return false;
        };

        state.indexes.remove(id, &old.attributes);
        if let Some(cache) = state.cache.as_mut() {
            cache.invalidate(id);
        }
        state.metrics.record_removal();
        tracing::trace!(id, "removed record");
        true
    }

    /// Ids whose `attr` equals `value`. Indexed attributes are answered from
    /// their index; others fall back to a scan.
    pub fn find_by_attribute(&self, attr: &str, value: impl Into<Value>) -> HashSet<String> {
        let Some(key) = IndexKey::from_value(&value.into()) else {
            return HashSet::new();
        };

        let state = self.state.lock();
        if let Some(ids) = state.indexes.find(attr, &key) {
            return ids;
        }
        state.scan(|r| r.get(attr).and_then(IndexKey::from_value).as_ref() == Some(&key))
    }

    /// Ids whose numeric `attr` lies in `[min, max]`. An inverted or NaN range
    /// yields an empty set. Infinite values are ordinary numbers here, on both
    /// the indexed and the scanned path.
    pub fn find_by_attribute_range(&self, attr: &str, min: f64, max: f64) -> HashSet<String> {
        if min.is_nan() || max.is_nan() || min > max {
            return HashSet::new();
        }

        let state = self.state.lock();
        if let Some(ids) = state.indexes.find_range(attr, min, max) {
            return ids;
        }
        state.scan(|r| {
            r.get(attr)
                .and_then(Value::as_number)
                .is_some_and(|n| min <= n && n <= max)
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.lock().records.contains_key(id)
    }

    pub fn list_ids(&self) -> Vec<String> {
        self.state.lock().records.keys().cloned().collect()
    }

    /// Names of every secondary index, attribute indexes first.
    pub fn index_names(&self) -> Vec<String> {
        self.state.lock().indexes.names().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.state.lock();
        let cache = state
            .cache
            .as_ref()
            .map(RecordCache::counters)
            .unwrap_or_default();

        StoreStats {
            records: state.records.len(),
            cached: state.cache.as_ref().map_or(0, RecordCache::len),
            cache,
            hit_rate: cache.hit_rate(),
            lookups: state.metrics.total_lookups(),
            writes: state.metrics.total_writes(),
            removals: state.metrics.total_removals(),
            avg_lookup_latency_us: state.metrics.avg_lookup_latency_us(),
            p95_lookup_latency_us: state.metrics.percentile_lookup_latency_us(95.0),
        }
    }
}

impl Default for IndexedStore {
    fn default() -> Self {
        Self::new()
    }
}
