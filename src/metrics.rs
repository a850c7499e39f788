//! Observability counters: cache hit rates, operation counts and latencies.

use serde::Serialize;
use std::time::Duration;

/// Hit/miss counters for one caching layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
}

impl CacheCounters {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Hit rate as a percentage of all lookups; 0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64 * 100.0
    }
}

/// Number of latency buckets. Bucket 0 holds sub-microsecond lookups and
/// bucket `i` holds lookups in `[2^(i-1), 2^i)` microseconds; the last bucket
/// absorbs everything slower.
pub const LATENCY_BUCKETS: usize = 32;

fn latency_bucket(duration: Duration) -> usize {
    let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
    ((u64::BITS - micros.leading_zeros()) as usize).min(LATENCY_BUCKETS - 1)
}

/// Store operation counters with a fixed-size lookup latency histogram.
///
/// Memory use is constant no matter how many operations are recorded, so
/// reading the figures under the store lock costs O(`LATENCY_BUCKETS`).
#[derive(Debug, Clone, Default)]
pub struct OpMetrics {
    lookups: u64,
    writes: u64,
    removals: u64,
    lookup_time: Duration,
    lookup_histogram: [u64; LATENCY_BUCKETS],
}

impl OpMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_lookup(&mut self, duration: Duration) {
        self.lookups += 1;
        self.lookup_time = self.lookup_time.saturating_add(duration);
        self.lookup_histogram[latency_bucket(duration)] += 1;
    }

    pub fn record_writes(&mut self, count: u64) {
        self.writes += count;
    }

    pub fn record_removal(&mut self) {
        self.removals += 1;
    }

    pub fn total_lookups(&self) -> u64 {
        self.lookups
    }

    pub fn total_writes(&self) -> u64 {
        self.writes
    }

    pub fn total_removals(&self) -> u64 {
        self.removals
    }

    /// Mean lookup latency in microseconds.
    pub fn avg_lookup_latency_us(&self) -> f64 {
        if self.lookups == 0 {
            return 0.0;
        }
        self.lookup_time.as_secs_f64() * 1e6 / self.lookups as f64
    }

    /// Upper edge, in microseconds, of the histogram bucket holding the
    /// `percentile`-th lookup (e.g. 50.0, 95.0). 0 before any lookup.
    pub fn percentile_lookup_latency_us(&self, percentile: f64) -> f64 {
        if self.lookups == 0 {
            return 0.0;
        }

        let target = ((percentile.clamp(0.0, 100.0) / 100.0) * self.lookups as f64).ceil() as u64;
        let target = target.max(1);

        let mut seen = 0;
        for (bucket, count) in self.lookup_histogram.iter().enumerate() {
            seen += count;
            if seen >= target {
                return (1u64 << bucket) as f64;
            }
        }
        (1u64 << (LATENCY_BUCKETS - 1)) as f64
    }
}
