//! AVL-backed ordered index module.

pub mod tree;

pub use tree::AvlTree;

use std::collections::HashMap;

use serde::Serialize;

use crate::entry::{check_metric, Entry};
use crate::error::Result;
use crate::index::RankedIndex;

/// Shape statistics for an ordered index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub nodes: usize,
    pub height: u32,
}

/// An ordered index over `(id, metric)` entries backed by an AVL tree.
///
/// Ids are unique: inserting a known id under a new metric moves it. Equal
/// metrics from different ids are all kept and ordered by id.
///
/// Carries no internal synchronisation; share it behind a lock.
#[derive(Debug, Clone, Default)]
pub struct OrderedIndex {
    tree: AvlTree,
    /// id -> metric currently stored in the tree
    positions: HashMap<String, f64>,
}

impl OrderedIndex {
    /// Create a new empty ordered index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current shape of the underlying tree.
    pub fn stats(&self) -> TreeStats {
        TreeStats {
            nodes: self.tree.len(),
            height: self.tree.height(),
        }
    }

    pub fn height(&self) -> u32 {
        self.tree.height()
    }

    /// Verify the AVL invariants and that the id map agrees with the tree.
    pub fn check_invariants(&self) -> bool {
        self.tree.check_invariants() && self.tree.len() == self.positions.len()
    }
}

impl RankedIndex for OrderedIndex {
    fn insert(&mut self, id: &str, metric: f64) -> Result<()> {
        check_metric(id, metric)?;

        match self.positions.get(id) {
            Some(&old) if old == metric => return Ok(()),
            Some(&old) => {
                self.tree.remove(old, id);
                tracing::trace!(id, old, metric, "moving entry");
            }
            None => {}
        }

        self.tree.insert(Entry::new(id, metric));
        self.positions.insert(id.to_string(), metric);
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Option<f64> {
        let metric = self.positions.remove(id)?;
        self.tree.remove(metric, id);
        Some(metric)
    }

    fn get(&self, id: &str) -> Option<f64> {
        self.positions.get(id).copied()
    }

    fn range(&self, min: f64, max: f64) -> Vec<Entry> {
        self.tree.range(min, max)
    }

    fn sorted(&self) -> Vec<Entry> {
        self.tree.in_order()
    }

    fn rank(&self, value: f64) -> usize {
        self.tree.count_less(value)
    }

    fn kth_smallest(&self, k: usize) -> Option<Entry> {
        self.tree.kth(k).cloned()
    }

    fn len(&self) -> usize {
        self.positions.len()
    }
}
