//! Best-value-per-id leaderboard.
//!
//! Each id keeps the lowest value ever submitted for it. Reads are served
//! from two derived views over the authoritative `best` map:
//!
//! - a binary min-heap, used for top-k extraction
//! - a sorted snapshot, used for rank, value ranges and percentiles
//!
//! Both views are rebuilt lazily. A brand-new id is pushed onto the heap
//! directly; an improvement or a removal only marks the views dirty. Every
//! read method settles the view it needs before touching it, so a caller can
//! never observe a stale value.

mod heap;

use heap::MinHeap;

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::LeaderboardConfig;
use crate::entry::{check_metric, Entry};
use crate::error::Result;
use crate::metrics::CacheCounters;

/// Distribution of current best values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileStats {
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub mean: f64,
}

impl PercentileStats {
    /// Nearest-rank style picks: `sorted[floor(q * n)]`.
    fn from_sorted(values: &[f64]) -> Option<Self> {
        let n = values.len();
        if n == 0 {
            return None;
        }
        let at = |q: f64| values[((q * n as f64) as usize).min(n - 1)];

        Some(Self {
            min: values[0],
            max: values[n - 1],
            median: values[n / 2],
            p25: values[n / 4],
            p75: values[3 * n / 4],
            p90: at(0.9),
            p95: at(0.95),
            mean: values.iter().sum::<f64>() / n as f64,
        })
    }
}

/// Leaderboard bookkeeping counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LeaderboardStats {
    pub entries: usize,
    pub heap_len: usize,
    pub updates: u64,
    pub queries: u64,
    pub top_k_cache: CacheCounters,
}

#[derive(Debug)]
struct BoardState {
    /// id -> best (lowest) value; the source of truth
    best: HashMap<String, f64>,
    heap: MinHeap,
    heap_dirty: bool,
    sorted: Vec<Entry>,
    sorted_dirty: bool,
    /// The best `cache_top_k` entries, valid until the next write.
    top_cache: Option<Vec<Entry>>,
    cache_top_k: usize,
    counters: CacheCounters,
    updates: u64,
    queries: u64,
}

impl BoardState {
    fn new(config: &LeaderboardConfig) -> Self {
        Self {
            best: HashMap::new(),
            heap: MinHeap::new(),
            heap_dirty: false,
            sorted: Vec::new(),
            sorted_dirty: false,
            top_cache: None,
            cache_top_k: config.cache_top_k,
            counters: CacheCounters::default(),
            updates: 0,
            queries: 0,
        }
    }

    fn apply(&mut self, id: &str, value: f64) -> bool {
        match self.best.get_mut(id) {
            None => {
                self.best.insert(id.to_string(), value);
                if !self.heap_dirty {
                    self.heap.push(Entry::new(id, value));
                }
            }
            Some(current) if value < *current => {
                tracing::trace!(id, old = *current, new = value, "improved best value");
                *current = value;
                self.heap_dirty = true;
            }
            Some(_) => return false,
        }

        self.sorted_dirty = true;
        self.top_cache = None;
        self.updates += 1;
        true
    }

    fn settle_heap(&mut self) {
        if self.heap_dirty {
            let entries = self.best.iter().map(|(id, v)| Entry::new(id.as_str(), *v)).collect();
            self.heap = MinHeap::from_entries(entries);
            self.heap_dirty = false;
            tracing::trace!(entries = self.heap.len(), "heap rebuilt");
        }
    }

    fn settle_sorted(&mut self) {
        if self.sorted_dirty {
            self.sorted = self.best.iter().map(|(id, v)| Entry::new(id.as_str(), *v)).collect();
            self.sorted.sort();
            self.sorted_dirty = false;
        }
    }

    /// Index of the first standing with value `>= value`.
    fn lower_bound(&self, value: f64) -> usize {
        self.sorted.partition_point(|e| e.metric < value)
    }
}

/// A thread-safe leaderboard keeping the best (lowest) value per id.
///
/// All methods take `&self`; a single mutex serialises every operation.
#[derive(Debug)]
pub struct Leaderboard {
    state: Mutex<BoardState>,
}

impl Leaderboard {
    /// Create an empty leaderboard with the default config.
    pub fn new() -> Self {
        Self::with_config(&LeaderboardConfig::default())
    }

    pub fn with_config(config: &LeaderboardConfig) -> Self {
        Self {
            state: Mutex::new(BoardState::new(config)),
        }
    }

    /// Submit a result. Inserts a new id, or lowers an existing id's best
    /// value when `value` is strictly better. Returns whether anything changed.
    pub fn add_result(&self, id: &str, value: f64) -> Result<bool> {
        check_metric(id, value)?;
        Ok(self.state.lock().apply(id, value))
    }

    /// Submit many results at once. Every value is validated before any is
    /// applied. Returns the number of results that changed the board.
    pub fn add_results_bulk(&self, results: &[(String, f64)]) -> Result<usize> {
        for (id, value) in results {
            check_metric(id, *value)?;
        }

        let mut state = self.state.lock();
        let changed = results
            .iter()
            .filter(|(id, value)| state.apply(id, *value))
            .count();
        tracing::debug!(submitted = results.len(), changed, "bulk results applied");
        Ok(changed)
    }

    /// The `k` best standings, ascending. Returns everything when `k` exceeds
    /// the number of entries.
    pub fn top_k(&self, k: usize) -> Vec<Entry> {
        let mut state = self.state.lock();
        state.queries += 1;

        if k == 0 {
            return Vec::new();
        }

        if k <= state.cache_top_k {
            if let Some(cached) = &state.top_cache {
                let result = cached.iter().take(k).cloned().collect();
                state.counters.record_hit();
                return result;
            }
            state.counters.record_miss();
            state.settle_heap();
            let cached = state.heap.smallest(state.cache_top_k);
            let result = cached.iter().take(k).cloned().collect();
            state.top_cache = Some(cached);
            return result;
        }

        state.settle_heap();
        state.heap.smallest(k)
    }

    /// 1-indexed position of `id`: one more than the number of ids with a
    /// strictly better value. `None` if `id` is absent.
    pub fn rank(&self, id: &str) -> Option<usize> {
        let mut state = self.state.lock();
        state.queries += 1;

        let value = *state.best.get(id)?;
        state.settle_sorted();
        Some(state.lower_bound(value) + 1)
    }

    /// Standings with `min <= value <= max`, ascending, at most `limit` of them.
    pub fn range_by_value(&self, min: f64, max: f64, limit: usize) -> Vec<Entry> {
        let mut state = self.state.lock();
        state.queries += 1;

        if min.is_nan() || max.is_nan() || min > max {
            return Vec::new();
        }

        state.settle_sorted();
        let start = state.lower_bound(min);
        state.sorted[start..]
            .iter()
            .take_while(|e| e.metric <= max)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Remove `id` entirely. Returns whether it was present.
    pub fn remove(&self, id: &str) -> bool {
        let mut state = self.state.lock();
        if state.best.remove(id).is_none() {
            return false;
        }

        state.heap_dirty = true;
        state.sorted_dirty = true;
        state.top_cache = None;
        state.updates += 1;
        true
    }

    /// Current best value for `id`.
    pub fn best(&self, id: &str) -> Option<f64> {
        self.state.lock().best.get(id).copied()
    }

    /// Every standing, ascending.
    pub fn all_results(&self) -> Vec<Entry> {
        let mut state = self.state.lock();
        state.settle_sorted();
        state.sorted.clone()
    }

    /// Min, max, median, quartiles, p90, p95 and mean of current best values.
    /// `None` when the board is empty.
    pub fn percentile_stats(&self) -> Option<PercentileStats> {
        let mut state = self.state.lock();
        state.settle_sorted();
        let values: Vec<f64> = state.sorted.iter().map(|e| e.metric).collect();
        PercentileStats::from_sorted(&values)
    }

    /// Settle both views and drop the top-k cache.
    pub fn compact(&self) {
        let mut state = self.state.lock();
        state.settle_heap();
        state.settle_sorted();
        state.top_cache = None;
    }

    pub fn stats(&self) -> LeaderboardStats {
        let state = self.state.lock();
        LeaderboardStats {
            entries: state.best.len(),
            heap_len: state.heap.len(),
            updates: state.updates,
            queries: state.queries,
            top_k_cache: state.counters,
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().best.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().best.is_empty()
    }
}

impl Default for Leaderboard {
    fn default() -> Self {
        Self::new()
    }
}
