//! Min-heap of standings over the total ordering of `Entry`

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::entry::Entry;

/// Array-backed binary min-heap of entries (lowest value at index 0).
///
/// The heap itself is oblivious to improvements and removals; its owner is
/// responsible for rebuilding it when it goes stale.
#[derive(Debug, Clone, Default)]
pub struct MinHeap {
    items: Vec<Entry>,
}

impl MinHeap {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Heapify a batch of entries in O(n).
    pub fn from_entries(entries: Vec<Entry>) -> Self {
        let mut heap = Self { items: entries };
        for i in (0..heap.items.len() / 2).rev() {
            heap.sift_down(i);
        }
        heap
    }

    pub fn push(&mut self, entry: Entry) {
        self.items.push(entry);
        self.sift_up(self.items.len() - 1);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The `k` lowest entries in ascending order, leaving the heap intact.
    ///
    /// Walks the heap best-first: a parent is never larger than its children,
    /// so the next smallest entry is always on the frontier of nodes whose
    /// parent has already been emitted. Costs O(k log k) and touches at most
    /// 2k + 1 slots.
    pub fn smallest(&self, k: usize) -> Vec<Entry> {
        let k = k.min(self.items.len());
        let mut out = Vec::with_capacity(k);
        if k == 0 {
            return out;
        }

        let mut frontier = BinaryHeap::with_capacity(k + 1);
        frontier.push(Reverse((&self.items[0], 0usize)));
        while out.len() < k {
            let Some(Reverse((entry, i))) = frontier.pop() else {
                break;
            };
            out.push(entry.clone());
            for child in [2 * i + 1, 2 * i + 2] {
                if let Some(next) = self.items.get(child) {
                    frontier.push(Reverse((next, child)));
                }
            }
        }
        out
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.items[i] >= self.items[parent] {
                break;
            }
            self.items.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut least = i;
            if left < len && self.items[left] < self.items[least] {
                least = left;
            }
            if right < len && self.items[right] < self.items[least] {
                least = right;
            }
            if least == i {
                break;
            }
            self.items.swap(i, least);
            i = least;
        }
    }
}
