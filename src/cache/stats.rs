//! Cache Statistics Module
//!
//! Tracks lifetime lookup outcomes and policy-driven evictions.

use serde::Serialize;

// == Cache Stats ==
/// Lifetime counters of a single cache instance.
///
/// Counters only ever grow; no cache operation resets them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of lookups that found the key
    pub hits: u64,
    /// Number of lookups that did not find the key
    pub misses: u64,
    /// Number of entries removed by the eviction policy
    pub evictions: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.lookups();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Total number of lookups resolved.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    // == Record Lookup ==
    /// Increments the hit or miss counter and passes the outcome through.
    pub fn record_lookup(&mut self, hit: bool) -> bool {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        hit
    }

    // == Record Eviction ==
    /// Increments the eviction counter.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        assert!(stats.record_lookup(true));
        assert!(stats.record_lookup(true));
        assert!(stats.record_lookup(true));
        assert!(!stats.record_lookup(false));
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(stats.lookups(), 4);
    }

    #[test]
    fn test_hit_rate_all_misses() {
        let mut stats = CacheStats::new();
        stats.record_lookup(false);
        stats.record_lookup(false);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_record_eviction() {
        let mut stats = CacheStats::new();
        stats.record_eviction();
        stats.record_eviction();
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.lookups(), 0);
    }

    #[test]
    fn test_stats_serialize() {
        let mut stats = CacheStats::new();
        stats.record_lookup(true);
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["hits"], 1);
        assert_eq!(json["misses"], 0);
        assert_eq!(json["evictions"], 0);
    }
}
