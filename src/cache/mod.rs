//! Cache Module
//!
//! Bounded in-memory key caches behind one [`Cache`] contract, with four
//! interchangeable eviction policies:
//!
//! - [`FifoCache`] - evicts in admission order
//! - [`LruCache`] - evicts the least recently used key
//! - [`LfuCache`] - evicts from the lowest access-count bucket
//! - [`HyperbolicCache`] - samples keys and evicts the lowest
//!   `access_count / age` priority
//!
//! Entries carry only the metadata their policy needs; no payloads are
//! stored. Every entry has a weight: [`Cache::set`] admits with weight 1, so
//! capacity counts entries, while [`Cache::set_weighted`] charges a caller
//! supplied size (key plus value bytes, for example) and capacity becomes a
//! byte budget.

mod arena;
mod fifo;
mod hyperbolic;
mod lfu;
mod lru;
mod shared;
mod stats;


use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{CacheError, Result};

// Re-export public types
pub use fifo::FifoCache;
pub use hyperbolic::{priority, HyperbolicCache};
pub use lfu::LfuCache;
pub use lru::LruCache;
pub use shared::SharedCache;
pub use stats::CacheStats;

/// Logical time supplied by the caller with every admission.
pub type Timestamp = u64;

// == Cache Contract ==
/// Operations shared by every eviction policy.
///
/// After any call returns, `used_storage() <= max_storage()` holds. `get` is
/// the only operation that touches the hit/miss counters.
pub trait Cache {
    /// Which eviction policy backs this cache.
    fn kind(&self) -> PolicyKind;

    /// Capacity bound fixed at construction.
    fn max_storage(&self) -> usize;

    /// Total weight of the resident entries.
    fn used_storage(&self) -> usize;

    /// Unused capacity.
    fn remaining_storage(&self) -> usize {
        self.max_storage().saturating_sub(self.used_storage())
    }

    /// Looks up `key`, counting a hit or a miss.
    ///
    /// A hit applies the policy's access side effect (recency, frequency or
    /// access count). A miss has no side effect beyond the counter.
    fn get(&mut self, key: &str) -> bool;

    /// Ensures `key` is resident with weight 1.
    ///
    /// With unit weights at most one entry is evicted. Returns false only
    /// when the cache has zero capacity.
    fn set(&mut self, timestamp: Timestamp, key: &str) -> bool {
        self.set_weighted(timestamp, key, 1)
    }

    /// Ensures `key` is resident with the given weight, evicting entries in
    /// policy order until it fits.
    ///
    /// A weight of zero is charged as 1. Returns false, leaving the cache
    /// untouched, when the weight exceeds `max_storage()`. Re-setting a
    /// resident key replaces its weight and counts as a use; the key itself
    /// is never evicted to make room for its own new weight.
    fn set_weighted(&mut self, timestamp: Timestamp, key: &str, weight: usize) -> bool;

    /// Deletes `key` if present, releasing its weight. Does not count as a
    /// lookup.
    fn remove(&mut self, key: &str) -> bool;

    /// Presence check without stats or policy side effects.
    fn contains(&self, key: &str) -> bool;

    /// Number of resident keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the lifetime counters.
    fn stats(&self) -> CacheStats;
}

// == Policy Kind ==
/// Tag naming an eviction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyKind {
    Fifo,
    Lru,
    Lfu,
    Hyperbolic,
}

impl PolicyKind {
    /// All policies, in the order reports list them.
    pub const ALL: [PolicyKind; 4] = [
        PolicyKind::Fifo,
        PolicyKind::Lru,
        PolicyKind::Lfu,
        PolicyKind::Hyperbolic,
    ];

    /// Upper-case policy name.
    pub fn name(self) -> &'static str {
        match self {
            PolicyKind::Fifo => "FIFO",
            PolicyKind::Lru => "LRU",
            PolicyKind::Lfu => "LFU",
            PolicyKind::Hyperbolic => "HYPERBOLIC",
        }
    }

    // == Factory ==
    /// Builds an empty cache of this kind.
    ///
    /// `sample_size` is only read by the hyperbolic policy, which also takes
    /// `seed` to make its sampling reproducible. Without a seed it draws one
    /// from the operating system.
    pub fn build(
        self,
        max_capacity: usize,
        sample_size: usize,
        seed: Option<u64>,
    ) -> Result<Box<dyn Cache + Send>> {
        let cache: Box<dyn Cache + Send> = match self {
            PolicyKind::Fifo => Box::new(FifoCache::new(max_capacity)),
            PolicyKind::Lru => Box::new(LruCache::new(max_capacity)),
            PolicyKind::Lfu => Box::new(LfuCache::new(max_capacity)),
            PolicyKind::Hyperbolic => match seed {
                Some(seed) => Box::new(HyperbolicCache::with_seed(
                    max_capacity,
                    sample_size,
                    seed,
                )?),
                None => Box::new(HyperbolicCache::new(max_capacity, sample_size)?),
            },
        };
        Ok(cache)
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(PolicyKind::Fifo),
            "lru" => Ok(PolicyKind::Lru),
            "lfu" => Ok(PolicyKind::Lfu),
            "hyperbolic" => Ok(PolicyKind::Hyperbolic),
            _ => Err(CacheError::UnknownPolicy(s.trim().to_string())),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_kind_parse() {
        assert_eq!("fifo".parse::<PolicyKind>().unwrap(), PolicyKind::Fifo);
        assert_eq!(" LRU ".parse::<PolicyKind>().unwrap(), PolicyKind::Lru);
        assert_eq!("Lfu".parse::<PolicyKind>().unwrap(), PolicyKind::Lfu);
        assert_eq!(
            "HYPERBOLIC".parse::<PolicyKind>().unwrap(),
            PolicyKind::Hyperbolic
        );
        assert!(matches!(
            "arc".parse::<PolicyKind>(),
            Err(CacheError::UnknownPolicy(name)) if name == "arc"
        ));
    }

    #[test]
    fn test_policy_kind_display_and_serialize() {
        assert_eq!(PolicyKind::Hyperbolic.to_string(), "HYPERBOLIC");
        let json = serde_json::to_string(&PolicyKind::Lfu).unwrap();
        assert_eq!(json, "\"LFU\"");
    }

    #[test]
    fn test_build_reports_kind() {
        for kind in PolicyKind::ALL {
            let cache = kind.build(8, 4, Some(7)).unwrap();
            assert_eq!(cache.kind(), kind);
            assert_eq!(cache.max_storage(), 8);
            assert_eq!(cache.remaining_storage(), 8);
            assert!(cache.is_empty());
        }
    }

    #[test]
    fn test_build_rejects_oversized_sample() {
        let result = PolicyKind::Hyperbolic.build(4, 5, None);
        assert!(matches!(
            result,
            Err(CacheError::SampleSizeTooLarge {
                sample_size: 5,
                max_capacity: 4
            })
        ));

        // Sample size is ignored by the classical policies
        assert!(PolicyKind::Lru.build(4, 5, None).is_ok());
    }

    #[test]
    fn test_zero_capacity_boundary() {
        for kind in PolicyKind::ALL {
            let mut cache = kind.build(0, 0, Some(1)).unwrap();
            for i in 0..3 {
                let key = format!("key{}", i);
                assert!(!cache.set(i, &key), "{} admitted into zero capacity", kind);
                assert!(!cache.get(&key));
            }
            assert_eq!(cache.len(), 0);
            assert_eq!(cache.remaining_storage(), 0);
            assert_eq!(cache.stats().misses, 3);
        }
    }

    #[test]
    fn test_reset_does_not_change_len() {
        for kind in PolicyKind::ALL {
            let mut cache = kind.build(4, 4, Some(3)).unwrap();
            assert!(cache.set(1, "a"));
            assert!(cache.set(2, "b"));
            assert_eq!(cache.len(), 2);
            assert!(cache.set(3, "a"));
            assert_eq!(cache.len(), 2, "{} changed len on re-set", kind);
        }
    }

    #[test]
    fn test_remove_has_no_stats_effect() {
        for kind in PolicyKind::ALL {
            let mut cache = kind.build(4, 2, Some(3)).unwrap();
            cache.set(1, "a");
            assert!(cache.remove("a"));
            assert!(!cache.remove("a"));
            assert!(!cache.contains("a"));
            assert_eq!(cache.len(), 0);
            assert_eq!(cache.stats(), CacheStats::new());
        }
    }
}
