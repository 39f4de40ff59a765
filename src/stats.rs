//! Cache statistics tracking.

use std::sync::atomic::{AtomicU64, Ordering};

/// Internal atomic counters, scoped to one started cache instance.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    requests: AtomicU64,
    hits: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
}

impl StatsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a lookup, hit or miss.
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup that returned a cached block.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an admission that created a new resident entry.
    pub fn record_insertion(&self) {
        self.insertions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the blocks removed by one eviction pass.
    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> CacheStats {
        // Hits are read before requests: every hit records its request
        // first, so a concurrent snapshot never sees hits > requests.
        let hits = self.hits.load(Ordering::Relaxed);
        CacheStats {
            hits,
            requests: self.requests.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of cache statistics.
///
/// All counters are monotonically non-decreasing for the life of a started
/// cache and reset only by a stop/start cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    requests: u64,
    hits: u64,
    insertions: u64,
    evictions: u64,
}

impl CacheStats {
    /// Number of lookups that returned a cached block.
    pub fn hit_count(&self) -> u64 {
        self.hits
    }

    /// Number of lookups, hit or miss. Always at least `hit_count`.
    pub fn request_count(&self) -> u64 {
        self.requests
    }

    /// Number of lookups that found nothing.
    pub fn miss_count(&self) -> u64 {
        self.requests.saturating_sub(self.hits)
    }

    /// Number of admissions that created a new resident entry.
    pub fn insertion_count(&self) -> u64 {
        self.insertions
    }

    /// Number of blocks removed under memory pressure.
    pub fn eviction_count(&self) -> u64 {
        self.evictions
    }

    /// Fraction of lookups that hit, 0.0 when nothing was requested yet.
    pub fn hit_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.requests as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_basic() {
        let counters = StatsCounters::new();

        counters.record_request();
        counters.record_hit();
        counters.record_request();

        let stats = counters.snapshot();
        assert_eq!(stats.request_count(), 2);
        assert_eq!(stats.hit_count(), 1);
        assert_eq!(stats.miss_count(), 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_stats_empty() {
        let stats = StatsCounters::new().snapshot();
        assert_eq!(stats.request_count(), 0);
        assert_eq!(stats.hit_count(), 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_stats_insertions_and_evictions() {
        let counters = StatsCounters::new();

        counters.record_insertion();
        counters.record_insertion();
        counters.record_evictions(2);

        let stats = counters.snapshot();
        assert_eq!(stats.insertion_count(), 2);
        assert_eq!(stats.eviction_count(), 2);
    }
}
