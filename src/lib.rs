//! # Ranked Index
//!
//! In-memory ranking structures for scored entities.
//!
//! This library provides:
//! - An AVL-backed ordered index with range, rank and k-th smallest queries
//! - A best-value-per-id leaderboard (lower is better) with top-k and percentiles
//! - A keyed record store with an LRU/TTL cache and secondary indexes
//! - A [`RankingEngine`] that keeps all three in step from one record stream
//!
//! ## Example
//!
//! ```rust
//! use ranked_index::{Leaderboard, OrderedIndex, RankedIndex};
//!
//! let mut index = OrderedIndex::new();
//! index.insert("A", 0.8).unwrap();
//! index.insert("B", 0.6).unwrap();
//! index.insert("C", 0.9).unwrap();
//! let in_range: Vec<String> = index.range(0.7, 1.0).into_iter().map(|e| e.id).collect();
//! assert_eq!(in_range, vec!["A", "C"]);
//!
//! let board = Leaderboard::new();
//! board.add_result("H1", 65.2).unwrap();
//! board.add_result("H2", 63.8).unwrap();
//! assert_eq!(board.rank("H2"), Some(1));
//! ```

pub mod avl;
pub mod config;
pub mod engine;
pub mod entry;
pub mod error;
pub mod index;
pub mod leaderboard;
pub mod metrics;
pub mod range_cache;
pub mod store;

pub use avl::{AvlTree, OrderedIndex, TreeStats};
pub use config::{EngineConfig, IndexConfig, LeaderboardConfig, RatioIndexConfig, StoreConfig};
pub use engine::{EngineStats, RankingEngine};
pub use entry::Entry;
pub use error::{RankedIndexError, Result};
pub use index::RankedIndex;
pub use leaderboard::{Leaderboard, LeaderboardStats, PercentileStats};
pub use range_cache::CachedIndex;
pub use store::{Attributes, IndexedStore, Record, StoreStats, Value};
