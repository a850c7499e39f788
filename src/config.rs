//! Configuration
//!
//! Every structure is built from an explicit config value. Configs derive
//! serde so a whole engine can be described in one TOML file:
//!
//! ```toml
//! index_attribute = "win_ratio"
//! leaderboard_attribute = "best_time"
//!
//! [store]
//! cache_size = 500
//! cache_ttl_secs = 60
//! indexed_attributes = ["jockey", "age"]
//!
//! [[store.ratio_indexes]]
//! name = "win_ratio"
//! numerator = "wins"
//! denominator = "races"
//! precision = 2
//!
//! [leaderboard]
//! cache_top_k = 10
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::error::{RankedIndexError, Result};

/// Largest number of decimal places a ratio index may round to.
pub const MAX_RATIO_PRECISION: u32 = 12;

/// Top-level configuration for a [`RankingEngine`](crate::engine::RankingEngine).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub leaderboard: LeaderboardConfig,

    #[serde(default)]
    pub store: StoreConfig,

    /// Numeric record attribute mirrored into the ordered index.
    #[serde(default)]
    pub index_attribute: Option<String>,

    /// Numeric record attribute fed to the leaderboard (lower is better).
    #[serde(default)]
    pub leaderboard_attribute: Option<String>,
}

/// Ordered index configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Wrap the AVL index in a range-result cache.
    #[serde(default = "default_range_cache")]
    pub range_cache: bool,

    #[serde(default = "default_range_cache_capacity")]
    pub range_cache_capacity: usize,
}

fn default_range_cache() -> bool {
    true
}

fn default_range_cache_capacity() -> usize {
    128
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            range_cache: default_range_cache(),
            range_cache_capacity: default_range_cache_capacity(),
        }
    }
}

/// Leaderboard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// Memoise the best `cache_top_k` standings between writes. 0 disables.
    #[serde(default = "default_cache_top_k")]
    pub cache_top_k: usize,
}

fn default_cache_top_k() -> usize {
    20
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            cache_top_k: default_cache_top_k(),
        }
    }
}

/// Indexed store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of records held by the read-through cache. 0 disables.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Seconds a cached record stays valid. 0 never expires.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Attributes with an equality secondary index.
    #[serde(default)]
    pub indexed_attributes: Vec<String>,

    /// Secondary indexes over a rounded ratio of two numeric attributes.
    #[serde(default)]
    pub ratio_indexes: Vec<RatioIndexConfig>,
}

fn default_cache_size() -> usize {
    1000
}

fn default_cache_ttl_secs() -> u64 {
    300
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_size: default_cache_size(),
            cache_ttl_secs: default_cache_ttl_secs(),
            indexed_attributes: Vec::new(),
            ratio_indexes: Vec::new(),
        }
    }
}

impl StoreConfig {
    /// Default caching with equality indexes on `attributes`.
    pub fn indexing<S: Into<String>>(attributes: impl IntoIterator<Item = S>) -> Self {
        Self {
            indexed_attributes: attributes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }
}

/// A derived index over `round(numerator / denominator, precision)`.
///
/// Records whose denominator is missing or not positive are not indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioIndexConfig {
    pub name: String,
    pub numerator: String,
    pub denominator: String,
    #[serde(default = "default_ratio_precision")]
    pub precision: u32,
}

fn default_ratio_precision() -> u32 {
    2
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Reject configurations no structure can be built from.
    pub fn validate(&self) -> Result<()> {
        if self.index.range_cache && self.index.range_cache_capacity == 0 {
            return Err(RankedIndexError::InvalidConfig(
                "index.range_cache_capacity must be positive when range_cache is on".into(),
            ));
        }

        for attr in [&self.index_attribute, &self.leaderboard_attribute]
            .into_iter()
            .flatten()
        {
            if attr.is_empty() {
                return Err(RankedIndexError::InvalidConfig(
                    "tracked attribute names must not be empty".into(),
                ));
            }
        }

        self.store.validate()
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();

        for attr in &self.indexed_attributes {
            if attr.is_empty() {
                return Err(RankedIndexError::InvalidConfig(
                    "indexed attribute names must not be empty".into(),
                ));
            }
            if !names.insert(attr.as_str()) {
                return Err(RankedIndexError::InvalidConfig(format!(
                    "attribute '{}' is indexed twice",
                    attr
                )));
            }
        }

        for ratio in &self.ratio_indexes {
            if ratio.name.is_empty() || ratio.numerator.is_empty() || ratio.denominator.is_empty() {
                return Err(RankedIndexError::InvalidConfig(
                    "ratio index fields must not be empty".into(),
                ));
            }
            if ratio.precision > MAX_RATIO_PRECISION {
                return Err(RankedIndexError::InvalidConfig(format!(
                    "ratio index '{}' precision {} exceeds {}",
                    ratio.name, ratio.precision, MAX_RATIO_PRECISION
                )));
            }
            if !names.insert(ratio.name.as_str()) {
                return Err(RankedIndexError::InvalidConfig(format!(
                    "index name '{}' is used twice",
                    ratio.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.index.range_cache);
        assert_eq!(config.leaderboard.cache_top_k, 20);
        assert_eq!(config.store.cache_size, 1000);
        assert_eq!(config.store.cache_ttl(), Some(Duration::from_secs(300)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            index_attribute = "win_ratio"
            leaderboard_attribute = "best_time"

            [store]
            cache_size = 5
            indexed_attributes = ["jockey"]

            [[store.ratio_indexes]]
            name = "win_ratio"
            numerator = "wins"
            denominator = "races"
            "#,
        )
        .unwrap();

        assert_eq!(config.index_attribute.as_deref(), Some("win_ratio"));
        assert_eq!(config.store.cache_size, 5);
        assert_eq!(config.store.cache_ttl_secs, 300);
        assert_eq!(config.store.ratio_indexes[0].precision, 2);
        assert_eq!(config.leaderboard, LeaderboardConfig::default());
    }

    #[test]
    fn test_rejects_bad_config() {
        let duplicate = EngineConfig::from_toml_str(
            r#"
            [store]
            indexed_attributes = ["jockey", "jockey"]
            "#,
        );
        assert!(matches!(duplicate, Err(RankedIndexError::InvalidConfig(_))));

        let zero_capacity = EngineConfig::from_toml_str(
            r#"
            [index]
            range_cache_capacity = 0
            "#,
        );
        assert!(zero_capacity.is_err());

        let malformed = EngineConfig::from_toml_str("store = 3");
        assert!(matches!(malformed, Err(RankedIndexError::SerializationError(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[leaderboard]\ncache_top_k = 0").unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.leaderboard.cache_top_k, 0);

        let missing = EngineConfig::from_file("/nonexistent/ranked-index.toml");
        assert!(matches!(missing, Err(RankedIndexError::IoError(_))));
    }
}
