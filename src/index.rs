//! Index trait for pluggable ordered-index layers

use crate::entry::{check_metric, Entry};
use crate::error::Result;

/// An ordered index over `(id, metric)` entries.
///
/// Implemented by the plain AVL index and by the range-caching decorator that
/// wraps it. Each id appears at most once; re-inserting an id moves it.
pub trait RankedIndex {
    /// Insert an entry, or move `id` to `metric` if it is already present.
    fn insert(&mut self, id: &str, metric: f64) -> Result<()>;

    /// Remove `id`, returning the metric it was stored under.
    fn remove(&mut self, id: &str) -> Option<f64>;

    /// The metric currently stored for `id`.
    fn get(&self, id: &str) -> Option<f64>;

    /// All entries with `min <= metric <= max`, ascending.
    /// An inverted or NaN range yields an empty result.
    fn range(&self, min: f64, max: f64) -> Vec<Entry>;

    /// All entries in ascending order.
    fn sorted(&self) -> Vec<Entry>;

    /// Number of entries with `metric < value`.
    fn rank(&self, value: f64) -> usize;

    /// The k-th smallest entry, 1-indexed.
    fn kth_smallest(&self, k: usize) -> Option<Entry>;

    /// The number of entries in this index.
    fn len(&self) -> usize;

    /// Whether the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert many entries. Every metric is validated before anything is
    /// inserted, so a rejected batch leaves the index untouched.
    fn insert_bulk(&mut self, items: &[(String, f64)]) -> Result<usize> {
        for (id, metric) in items {
            check_metric(id, *metric)?;
        }

        let mut sorted: Vec<&(String, f64)> = items.iter().collect();
        sorted.sort_by(|a, b| a.1.total_cmp(&b.1));

        for (id, metric) in sorted {
            self.insert(id, *metric)?;
        }
        Ok(items.len())
    }
}
