//! Secondary indexes - inverted maps from attribute value to record ids
//!
//! Maps `name -> value -> {ids}`. Buckets are removed as soon as their last
//! id leaves, so every bucket present is non-empty.

use std::collections::{HashMap, HashSet};

use crate::config::{RatioIndexConfig, StoreConfig};
use crate::store::record::{Attributes, IndexKey};

/// What an index is computed from.
#[derive(Debug, Clone)]
enum IndexSource {
    /// The attribute's own value.
    Attribute(String),
    /// `round(numerator / denominator, precision)` when the denominator is positive.
    Ratio(RatioIndexConfig),
}

impl IndexSource {
    fn name(&self) -> &str {
        match self {
            IndexSource::Attribute(name) => name,
            IndexSource::Ratio(ratio) => &ratio.name,
        }
    }

    fn key_for(&self, attributes: &Attributes) -> Option<IndexKey> {
        match self {
            IndexSource::Attribute(name) => attributes.get(name).and_then(IndexKey::from_value),
            IndexSource::Ratio(ratio) => {
                let num = attributes.get(&ratio.numerator)?.as_number()?;
                let den = attributes.get(&ratio.denominator)?.as_number()?;
                if !(num.is_finite() && den.is_finite() && den > 0.0) {
                    return None;
                }
                let scale = 10f64.powi(ratio.precision as i32);
                IndexKey::number((num / den * scale).round() / scale)
            }
        }
    }
}

type Buckets = HashMap<IndexKey, HashSet<String>>;

/// The set of secondary indexes configured for a store.
#[derive(Debug)]
pub struct SecondaryIndexes {
    sources: Vec<IndexSource>,
    buckets: HashMap<String, Buckets>,
}

impl SecondaryIndexes {
    pub fn new(config: &StoreConfig) -> Self {
        let sources: Vec<IndexSource> = config
            .indexed_attributes
            .iter()
            .cloned()
            .map(IndexSource::Attribute)
            .chain(config.ratio_indexes.iter().cloned().map(IndexSource::Ratio))
            .collect();

        let buckets = sources
            .iter()
            .map(|s| (s.name().to_string(), Buckets::new()))
            .collect();

        Self { sources, buckets }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(IndexSource::name)
    }

    /// Add `id` to the bucket of every index its attributes produce a key for.
    pub fn add(&mut self, id: &str, attributes: &Attributes) {
        for source in &self.sources {
            let Some(key) = source.key_for(attributes) else {
                continue;
            };
            if let Some(buckets) = self.buckets.get_mut(source.name()) {
                buckets.entry(key).or_default().insert(id.to_string());
            }
        }
    }

    /// Remove `id` from the buckets `attributes` placed it in.
    pub fn remove(&mut self, id: &str, attributes: &Attributes) {
        for source in &self.sources {
            let Some(key) = source.key_for(attributes) else {
                continue;
            };
            let Some(buckets) = self.buckets.get_mut(source.name()) else {
                continue;
            };
            if let Some(ids) = buckets.get_mut(&key) {
                ids.remove(id);
                if ids.is_empty() {
                    buckets.remove(&key);
                }
            }
        }
    }

    /// Ids whose `name` index key equals `key`. `None` if `name` is not indexed.
    pub fn find(&self, name: &str, key: &IndexKey) -> Option<HashSet<String>> {
        let buckets = self.buckets.get(name)?;
        Some(buckets.get(key).cloned().unwrap_or_default())
    }

    /// Union of the numeric buckets of `name` whose key lies in `[min, max]`.
    /// `None` if `name` is not indexed.
    pub fn find_range(&self, name: &str, min: f64, max: f64) -> Option<HashSet<String>> {
        let buckets = self.buckets.get(name)?;
        let mut result = HashSet::new();
        for (key, ids) in buckets {
            if key.as_number().is_some_and(|n| min <= n && n <= max) {
                result.extend(ids.iter().cloned());
            }
        }
        Some(result)
    }

    /// Number of distinct values held by index `name`.
    #[cfg(test)]
    fn bucket_count(&self, name: &str) -> usize {
        self.buckets.get(name).map_or(0, HashMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::record::Record;

    fn config() -> StoreConfig {
        StoreConfig {
            ratio_indexes: vec![RatioIndexConfig {
                name: "win_ratio".into(),
                numerator: "wins".into(),
                denominator: "races".into(),
                precision: 2,
            }],
            ..StoreConfig::indexing(["jockey"])
        }
    }

    #[test]
    fn test_add_find_remove() {
        let mut indexes = SecondaryIndexes::new(&config());
        let h1 = Record::new("H1").with("jockey", "Smith");
        let h2 = Record::new("H2").with("jockey", "Smith");
        indexes.add("H1", &h1.attributes);
        indexes.add("H2", &h2.attributes);

        let smith = IndexKey::Text("Smith".into());
        assert_eq!(indexes.find("jockey", &smith).unwrap().len(), 2);

        indexes.remove("H1", &h1.attributes);
        assert_eq!(indexes.find("jockey", &smith).unwrap().len(), 1);

        indexes.remove("H2", &h2.attributes);
        assert!(indexes.find("jockey", &smith).unwrap().is_empty());
        assert_eq!(indexes.bucket_count("jockey"), 0);
    }

    #[test]
    fn test_unindexed_name() {
        let indexes = SecondaryIndexes::new(&config());
        assert!(indexes.find("age", &IndexKey::Text("4".into())).is_none());
        assert!(indexes.find_range("age", 0.0, 10.0).is_none());
    }

    #[test]
    fn test_ratio_index() {
        let mut indexes = SecondaryIndexes::new(&config());
        let h1 = Record::new("H1").with("wins", 1).with("races", 3);
        let h2 = Record::new("H2").with("wins", 2).with("races", 0);
        indexes.add("H1", &h1.attributes);
        indexes.add("H2", &h2.attributes);

        let key = IndexKey::number(0.33).unwrap();
        assert_eq!(
            indexes.find("win_ratio", &key).unwrap(),
            HashSet::from(["H1".to_string()])
        );
        assert_eq!(indexes.bucket_count("win_ratio"), 1);
        assert_eq!(indexes.find_range("win_ratio", 0.3, 0.4).unwrap().len(), 1);
    }

    #[test]
    fn test_names_in_config_order() {
        let indexes = SecondaryIndexes::new(&config());
        let names: Vec<&str> = indexes.names().collect();
        assert_eq!(names, vec!["jockey", "win_ratio"]);
    }
}
