//! AVL tree node structure and balancing algorithms.
//!
//! Nodes are exclusively owned boxes; no node is reachable from two places.
//! Every node caches its height and subtree size, so rank and k-th order
//! statistic queries run in O(log n).

use std::cmp::Ordering;

use crate::entry::Entry;

type Link = Option<Box<Node>>;

/// A node in the AVL tree.
#[derive(Debug, Clone)]
struct Node {
    entry: Entry,
    left: Link,
    right: Link,
    /// 1 for a leaf.
    height: u32,
    /// Number of nodes in this subtree, including this one.
    size: usize,
}

impl Node {
    fn leaf(entry: Entry) -> Box<Node> {
        Box::new(Node {
            entry,
            left: None,
            right: None,
            height: 1,
            size: 1,
        })
    }

    fn update(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
        self.size = 1 + size(&self.left) + size(&self.right);
    }

    fn balance_factor(&self) -> i64 {
        height(&self.left) as i64 - height(&self.right) as i64
    }
}

fn height(link: &Link) -> u32 {
    link.as_ref().map_or(0, |n| n.height)
}

fn size(link: &Link) -> usize {
    link.as_ref().map_or(0, |n| n.size)
}

fn rotate_right(mut node: Box<Node>) -> Box<Node> {
    match node.left.take() {
        Some(mut pivot) => {
            node.left = pivot.right.take();
            node.update();
            pivot.right = Some(node);
            pivot.update();
            pivot
        }
        None => node,
    }
}

fn rotate_left(mut node: Box<Node>) -> Box<Node> {
    match node.right.take() {
        Some(mut pivot) => {
            node.right = pivot.left.take();
            node.update();
            pivot.left = Some(node);
            pivot.update();
            pivot
        }
        None => node,
    }
}

/// Restore the balance invariant at `node`, assuming both subtrees are
/// already balanced and differ in height by at most 2.
fn rebalance(mut node: Box<Node>) -> Box<Node> {
    node.update();
    let balance = node.balance_factor();

    if balance > 1 {
        // Left-Right: straighten into Left-Left first.
        if node.left.as_ref().map_or(0, |l| l.balance_factor()) < 0 {
            node.left = node.left.take().map(rotate_left);
        }
        return rotate_right(node);
    }

    if balance < -1 {
        // Right-Left: straighten into Right-Right first.
        if node.right.as_ref().map_or(0, |r| r.balance_factor()) > 0 {
            node.right = node.right.take().map(rotate_right);
        }
        return rotate_left(node);
    }

    node
}

fn insert_node(link: Link, entry: Entry) -> (Box<Node>, bool) {
    let mut node = match link {
        Some(node) => node,
        None => return (Node::leaf(entry), true),
    };

    let inserted = match entry.cmp(&node.entry) {
        Ordering::Less => {
            let (child, inserted) = insert_node(node.left.take(), entry);
            node.left = Some(child);
            inserted
        }
        Ordering::Greater => {
            let (child, inserted) = insert_node(node.right.take(), entry);
            node.right = Some(child);
            inserted
        }
        Ordering::Equal => return (node, false),
    };

    (rebalance(node), inserted)
}

/// Detach the minimum node of a subtree, returning the rebalanced remainder.
fn take_min(mut node: Box<Node>) -> (Link, Box<Node>) {
    match node.left.take() {
        None => {
            let rest = node.right.take();
            (rest, node)
        }
        Some(left) => {
            let (rest, min) = take_min(left);
            node.left = rest;
            (Some(rebalance(node)), min)
        }
    }
}

fn remove_node(link: Link, metric: f64, id: &str) -> (Link, Option<Entry>) {
    let mut node = match link {
        Some(node) => node,
        None => return (None, None),
    };

    let removed = match node.entry.key_cmp(metric, id) {
        Ordering::Greater => {
            let (child, removed) = remove_node(node.left.take(), metric, id);
            node.left = child;
            removed
        }
        Ordering::Less => {
            let (child, removed) = remove_node(node.right.take(), metric, id);
            node.right = child;
            removed
        }
        Ordering::Equal => {
            let Node {
                entry, left, right, ..
            } = *node;
            let replacement = match (left, right) {
                (None, None) => None,
                (Some(child), None) | (None, Some(child)) => Some(child),
                (Some(left), Some(right)) => {
                    let (rest, mut successor) = take_min(right);
                    successor.left = Some(left);
                    successor.right = rest;
                    Some(rebalance(successor))
                }
            };
            return (replacement, Some(entry));
        }
    };

    if removed.is_none() {
        return (Some(node), None);
    }
    (Some(rebalance(node)), removed)
}

fn collect_in_order(link: &Link, out: &mut Vec<Entry>) {
    if let Some(node) = link {
        collect_in_order(&node.left, out);
        out.push(node.entry.clone());
        collect_in_order(&node.right, out);
    }
}

/// In-order range walk that skips subtrees lying entirely outside the range.
///
/// Entries sharing a metric may sit on either side of each other, so both
/// comparisons are inclusive.
fn collect_range(link: &Link, min: f64, max: f64, out: &mut Vec<Entry>) {
    if let Some(node) = link {
        let metric = node.entry.metric;
        if metric >= min {
            collect_range(&node.left, min, max, out);
        }
        if min <= metric && metric <= max {
            out.push(node.entry.clone());
        }
        if metric <= max {
            collect_range(&node.right, min, max, out);
        }
    }
}

fn check_node(link: &Link, lower: Option<&Entry>, upper: Option<&Entry>) -> Option<(u32, usize)> {
    let node = match link {
        Some(node) => node,
        None => return Some((0, 0)),
    };

    if lower.is_some_and(|l| node.entry <= *l) || upper.is_some_and(|u| node.entry >= *u) {
        return None;
    }

    let (lh, ls) = check_node(&node.left, lower, Some(&node.entry))?;
    let (rh, rs) = check_node(&node.right, Some(&node.entry), upper)?;

    let h = 1 + lh.max(rh);
    let s = 1 + ls + rs;
    if lh.abs_diff(rh) > 1 || node.height != h || node.size != s {
        return None;
    }
    Some((h, s))
}

/// A self-balancing binary search tree of entries ordered by `(metric, id)`.
#[derive(Debug, Clone, Default)]
pub struct AvlTree {
    root: Link,
}

impl AvlTree {
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Insert an entry. Returns false if an identical `(metric, id)` entry
    /// was already present.
    pub fn insert(&mut self, entry: Entry) -> bool {
        let (root, inserted) = insert_node(self.root.take(), entry);
        self.root = Some(root);
        inserted
    }

    /// Remove the entry with exactly this `(metric, id)` key.
    pub fn remove(&mut self, metric: f64, id: &str) -> Option<Entry> {
        let (root, removed) = remove_node(self.root.take(), metric, id);
        self.root = root;
        removed
    }

    pub fn len(&self) -> usize {
        size(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Height of the tree; 0 when empty.
    pub fn height(&self) -> u32 {
        height(&self.root)
    }

    pub fn in_order(&self) -> Vec<Entry> {
        let mut out = Vec::with_capacity(self.len());
        collect_in_order(&self.root, &mut out);
        out
    }

    pub fn range(&self, min: f64, max: f64) -> Vec<Entry> {
        let mut out = Vec::new();
        if min <= max {
            collect_range(&self.root, min, max, &mut out);
        }
        out
    }

    /// Count entries with `metric < value`.
    pub fn count_less(&self, value: f64) -> usize {
        let mut count = 0;
        let mut cursor = &self.root;
        while let Some(node) = cursor {
            if node.entry.metric < value {
                count += size(&node.left) + 1;
                cursor = &node.right;
            } else {
                cursor = &node.left;
            }
        }
        count
    }

    /// The k-th smallest entry, 1-indexed.
    pub fn kth(&self, k: usize) -> Option<&Entry> {
        if k == 0 || k > self.len() {
            return None;
        }

        let mut k = k;
        let mut cursor = &self.root;
        while let Some(node) = cursor {
            let left = size(&node.left);
            match k.cmp(&(left + 1)) {
                Ordering::Less => cursor = &node.left,
                Ordering::Equal => return Some(&node.entry),
                Ordering::Greater => {
                    k -= left + 1;
                    cursor = &node.right;
                }
            }
        }
        None
    }

    /// Verify ordering, balance, height and size bookkeeping at every node.
    pub fn check_invariants(&self) -> bool {
        check_node(&self.root, None, None).is_some()
    }
}
