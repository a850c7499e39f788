//! Ranking engine: a record store with two derived views kept in step.
//!
//! The store is the source of truth for attributes. One numeric attribute is
//! mirrored into the ordered index (latest value wins) and one is fed to the
//! leaderboard (best value wins). Each component keeps its own lock, so a
//! compound call is not atomic: a concurrent reader may see the store updated
//! before the views are.

use std::num::NonZeroUsize;

use parking_lot::Mutex;
use serde::Serialize;

use crate::avl::OrderedIndex;
use crate::config::EngineConfig;
use crate::entry::check_metric;
use crate::error::{RankedIndexError, Result};
use crate::index::RankedIndex;
use crate::leaderboard::{Leaderboard, LeaderboardStats};
use crate::range_cache::CachedIndex;
use crate::store::{Attributes, IndexedStore, Record, StoreStats, Value};

/// Combined statistics for all three components.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStats {
    pub store: StoreStats,
    pub leaderboard: LeaderboardStats,
    pub index_entries: usize,
}

/// Composes an [`IndexedStore`], an ordered index and a [`Leaderboard`].
pub struct RankingEngine {
    config: EngineConfig,
    store: IndexedStore,
    index: Mutex<Box<dyn RankedIndex + Send>>,
    leaderboard: Leaderboard,
}

impl std::fmt::Debug for RankingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankingEngine")
            .field("config", &self.config)
            .field("records", &self.store.len())
            .field("index_entries", &self.index.lock().len())
            .field("leaderboard_entries", &self.leaderboard.len())
            .finish()
    }
}

impl RankingEngine {
    /// Build an engine from a validated config.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let index: Box<dyn RankedIndex + Send> = match NonZeroUsize::new(config.index.range_cache_capacity) {
            Some(capacity) if config.index.range_cache => {
                Box::new(CachedIndex::new(OrderedIndex::new(), capacity))
            }
            _ => Box::new(OrderedIndex::new()),
        };

        tracing::debug!(
            index_attribute = ?config.index_attribute,
            leaderboard_attribute = ?config.leaderboard_attribute,
            range_cache = config.index.range_cache,
            "ranking engine created"
        );

        Ok(Self {
            store: IndexedStore::with_config(&config.store),
            leaderboard: Leaderboard::with_config(&config.leaderboard),
            index: Mutex::new(index),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &IndexedStore {
        &self.store
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    /// Run `f` against the ordered index while holding its lock.
    pub fn with_index<R>(&self, f: impl FnOnce(&dyn RankedIndex) -> R) -> R {
        let index = self.index.lock();
        f(&**index)
    }

    /// Insert or replace a record and refresh both views.
    pub fn upsert(&self, record: Record) -> Result<()> {
        self.check_tracked(&record.id, &record.attributes)?;

        let id = record.id.clone();
        let attributes = record.attributes.clone();
        self.store.insert_record(record);
        self.sync_views(&id, &attributes)
    }

    /// Upsert many records. Every record is validated before any is stored.
    pub fn upsert_bulk(&self, records: Vec<Record>) -> Result<usize> {
        for record in &records {
            self.check_tracked(&record.id, &record.attributes)?;
        }

        let synced: Vec<(String, Attributes)> = records
            .iter()
            .map(|r| (r.id.clone(), r.attributes.clone()))
            .collect();
        let count = self.store.insert_bulk(records);

        for (id, attributes) in &synced {
            self.sync_views(id, attributes)?;
        }
        tracing::info!(count, "records loaded");
        Ok(count)
    }

    /// Merge `partial` into an existing record. Returns false if `id` is absent.
    pub fn update(&self, id: &str, partial: Attributes) -> Result<bool> {
        self.check_tracked(id, &partial)?;

        match self.store.update_merged(id, partial) {
            Some(merged) => {
                self.sync_views(id, &merged)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove `id` from the store and both views.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.store.remove(id);
        self.index.lock().remove(id);
        self.leaderboard.remove(id);
        removed
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            store: self.store.stats(),
            leaderboard: self.leaderboard.stats(),
            index_entries: self.index.lock().len(),
        }
    }

    /// Reject non-finite numbers in either tracked attribute.
    fn check_tracked(&self, id: &str, attributes: &Attributes) -> Result<()> {
        for attr in [&self.config.index_attribute, &self.config.leaderboard_attribute]
            .into_iter()
            .flatten()
        {
            if let Some(Value::Number(n)) = attributes.get(attr) {
                check_metric(id, *n)?;
            }
        }
        Ok(())
    }

    fn sync_views(&self, id: &str, attributes: &Attributes) -> Result<()> {
        if let Some(attr) = &self.config.index_attribute {
            let mut index = self.index.lock();
            match attributes.get(attr).and_then(Value::as_number) {
                Some(metric) => index.insert(id, metric)?,
                None => {
                    index.remove(id);
                }
            }
        }

        if let Some(attr) = &self.config.leaderboard_attribute {
            if let Some(value) = attributes.get(attr).and_then(Value::as_number) {
                self.leaderboard.add_result(id, value)?;
            }
        }
        Ok(())
    }
}

impl TryFrom<EngineConfig> for RankingEngine {
    type Error = RankedIndexError;

    fn try_from(config: EngineConfig) -> Result<Self> {
        Self::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RatioIndexConfig, StoreConfig};
    use crate::entry::Entry;

    fn engine() -> RankingEngine {
        RankingEngine::new(EngineConfig {
            index_attribute: Some("win_ratio".into()),
            leaderboard_attribute: Some("best_time".into()),
            store: StoreConfig {
                ratio_indexes: vec![RatioIndexConfig {
                    name: "ratio".into(),
                    numerator: "wins".into(),
                    denominator: "races".into(),
                    precision: 2,
                }],
                ..StoreConfig::indexing(["jockey"])
            },
            ..EngineConfig::default()
        })
        .unwrap()
    }

    fn horse(id: &str, jockey: &str, ratio: f64, time: f64) -> Record {
        Record::new(id)
            .with("jockey", jockey)
            .with("win_ratio", ratio)
            .with("best_time", time)
    }

    #[test]
    fn test_upsert_feeds_views() {
        let engine = engine();
        engine.upsert(horse("H1", "Smith", 0.8, 65.2)).unwrap();
        engine.upsert(horse("H2", "Jones", 0.6, 63.8)).unwrap();

        let sorted = engine.with_index(|idx| idx.sorted());
        assert_eq!(sorted, vec![Entry::new("H2", 0.6), Entry::new("H1", 0.8)]);
        assert_eq!(engine.leaderboard().top_k(1), vec![Entry::new("H2", 63.8)]);
        assert_eq!(engine.store().find_by_attribute("jockey", "Smith").len(), 1);
    }

    #[test]
    fn test_update_moves_index_and_improves_board() {
        let engine = engine();
        engine.upsert(horse("H1", "Smith", 0.8, 65.2)).unwrap();

        let partial: Attributes = [
            ("win_ratio".to_string(), Value::from(0.9)),
            ("best_time".to_string(), Value::from(62.0)),
        ]
        .into_iter()
        .collect();
        assert!(engine.update("H1", partial).unwrap());

        assert_eq!(engine.with_index(|idx| idx.get("H1")), Some(0.9));
        assert_eq!(engine.leaderboard().best("H1"), Some(62.0));
        assert!(!engine.update("missing", Attributes::new()).unwrap());
    }

    #[test]
    fn test_update_is_not_a_lookup() {
        let engine = engine();
        engine.upsert(horse("H1", "Smith", 0.8, 65.2)).unwrap();

        let partial: Attributes = [("win_ratio".to_string(), Value::from(0.7))].into_iter().collect();
        assert!(engine.update("H1", partial).unwrap());

        let stats = engine.stats().store;
        assert_eq!(stats.lookups, 0);
        assert_eq!(stats.cache.hits, 0);
        assert_eq!(stats.cache.misses, 0);
        assert_eq!(stats.writes, 2);
        assert_eq!(engine.with_index(|idx| idx.get("H1")), Some(0.7));
    }

    #[test]
    fn test_remove_clears_everything() {
        let engine = engine();
        engine.upsert(horse("H1", "Smith", 0.8, 65.2)).unwrap();
        assert!(engine.remove("H1"));

        assert!(engine.store().get("H1").is_none());
        assert!(engine.with_index(|idx| idx.is_empty()));
        assert!(engine.leaderboard().is_empty());
        assert!(!engine.remove("H1"));
    }

    #[test]
    fn test_missing_metric_drops_from_index() {
        let engine = engine();
        engine.upsert(horse("H1", "Smith", 0.8, 65.2)).unwrap();
        engine.upsert(Record::new("H1").with("jockey", "Smith")).unwrap();

        assert!(engine.with_index(|idx| idx.get("H1")).is_none());
        // Leaderboard results are history: the best time survives.
        assert_eq!(engine.leaderboard().best("H1"), Some(65.2));
    }

    #[test]
    fn test_rejects_non_finite_before_storing() {
        let engine = engine();
        let result = engine.upsert(horse("H1", "Smith", f64::NAN, 60.0));
        assert!(matches!(result, Err(RankedIndexError::NonFiniteMetric { .. })));
        assert!(engine.store().is_empty());

        let bulk = engine.upsert_bulk(vec![
            horse("H1", "Smith", 0.5, 60.0),
            horse("H2", "Smith", 0.5, f64::INFINITY),
        ]);
        assert!(bulk.is_err());
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_bulk_and_stats() {
        let engine = engine();
        let records: Vec<Record> = (0..10)
            .map(|i| horse(&format!("H{}", i), "Smith", i as f64 / 10.0, 60.0 + i as f64))
            .collect();
        assert_eq!(engine.upsert_bulk(records).unwrap(), 10);

        let stats = engine.stats();
        assert_eq!(stats.store.records, 10);
        assert_eq!(stats.leaderboard.entries, 10);
        assert_eq!(stats.index_entries, 10);
        assert_eq!(engine.with_index(|idx| idx.range(0.25, 0.55).len()), 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            index_attribute: Some(String::new()),
            ..EngineConfig::default()
        };
        assert!(RankingEngine::try_from(config).is_err());
    }
}
