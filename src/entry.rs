//! Entry type shared by the ordered index and the leaderboard

use crate::error::{RankedIndexError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// An `(id, metric)` pair.
///
/// Identity is the `id`. Ordering is by `metric` with ties broken by `id`,
/// so two entries sharing a metric still have a deterministic order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub metric: f64,
}

impl Entry {
    /// Create an entry without validating the metric.
    pub fn new(id: impl Into<String>, metric: f64) -> Self {
        Self {
            id: id.into(),
            metric,
        }
    }

    /// Create an entry, rejecting NaN and infinite metrics.
    pub fn checked(id: impl Into<String>, metric: f64) -> Result<Self> {
        let id = id.into();
        check_metric(&id, metric)?;
        Ok(Self { id, metric })
    }

    /// Compare by metric, then by id.
    pub fn key_cmp(&self, metric: f64, id: &str) -> Ordering {
        self.metric
            .total_cmp(&metric)
            .then_with(|| self.id.as_str().cmp(id))
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key_cmp(other.metric, &other.id)
    }
}

impl From<(&str, f64)> for Entry {
    fn from((id, metric): (&str, f64)) -> Self {
        Entry::new(id, metric)
    }
}

/// Reject metrics that have no place in a total order over finite values.
pub fn check_metric(id: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RankedIndexError::NonFiniteMetric {
            id: id.to_string(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_by_metric_then_id() {
        let mut entries = vec![
            Entry::new("b", 1.0),
            Entry::new("a", 2.0),
            Entry::new("a", 1.0),
        ];
        entries.sort();

        assert_eq!(entries[0], Entry::new("a", 1.0));
        assert_eq!(entries[1], Entry::new("b", 1.0));
        assert_eq!(entries[2], Entry::new("a", 2.0));
    }

    #[test]
    fn test_checked_rejects_non_finite() {
        assert!(Entry::checked("x", 0.5).is_ok());
        assert!(matches!(
            Entry::checked("x", f64::NAN),
            Err(RankedIndexError::NonFiniteMetric { .. })
        ));
        assert!(Entry::checked("x", f64::INFINITY).is_err());
        assert!(Entry::checked("x", f64::NEG_INFINITY).is_err());
    }
}
