//! Hyperbolic Cache Module
//!
//! Randomized eviction by decayed priority. Every entry keeps an access
//! count and the logical time it was first admitted; its priority is
//!
//! ```text
//!   priority = access_count / (now - inserted_at)
//! ```
//!
//! so value decays with age unless the entry keeps getting used. Instead of
//! ordering all entries (priorities shift continuously as time advances),
//! eviction draws `sample_size` distinct resident keys uniformly at random
//! and evicts the sampled key with the lowest priority. Eviction cost is
//! O(sample_size), independent of capacity.
//!
//! Resident keys sit in a dense vector so a uniform sample is a set of
//! indices; removals swap the last key into the vacated slot.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::cache::{Cache, CacheStats, PolicyKind, Timestamp};
use crate::error::{CacheError, Result};

// == Priority ==
/// Priority of an entry with `access_count` uses, admitted at `inserted_at`,
/// evaluated at `now`.
///
/// Elapsed time is clamped to at least one tick. An entry evaluated in the
/// same tick it was admitted (or at an earlier tick, for out-of-order
/// traces) therefore ranks by its access count alone.
pub fn priority(access_count: u64, inserted_at: Timestamp, now: Timestamp) -> f64 {
    let elapsed = now.saturating_sub(inserted_at).max(1);
    access_count as f64 / elapsed as f64
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    /// Position in the dense key vector
    slot: usize,
    access_count: u64,
    inserted_at: Timestamp,
    weight: usize,
}

// == Hyperbolic Cache ==
/// Cache that evicts the lowest-priority key out of a random sample.
///
/// The random source is injected so eviction choices are reproducible:
/// [`HyperbolicCache::with_seed`] for a fixed seed, or
/// [`HyperbolicCache::with_rng`] for any `Rng`.
///
/// # Example
/// ```
/// use hypercache::cache::{Cache, HyperbolicCache};
///
/// let mut cache = HyperbolicCache::with_seed(2, 2, 42).unwrap();
/// cache.set(1, "cold");
/// cache.set(2, "hot");
/// cache.get("hot");
///
/// cache.set(3, "new");
/// assert!(cache.contains("hot"));
/// assert!(!cache.contains("cold"));
/// ```
#[derive(Debug)]
pub struct HyperbolicCache<R = StdRng> {
    entries: HashMap<String, Entry>,
    /// Dense resident key set, sampled on eviction
    keys: Vec<String>,
    max_capacity: usize,
    /// Total weight of resident keys
    used: usize,
    sample_size: usize,
    rng: R,
    stats: CacheStats,
}

impl HyperbolicCache<StdRng> {
    // == Constructors ==
    /// Creates an empty cache seeded from the operating system.
    pub fn new(max_capacity: usize, sample_size: usize) -> Result<Self> {
        Self::with_rng(max_capacity, sample_size, StdRng::from_os_rng())
    }

    /// Creates an empty cache whose sampling is fixed by `seed`.
    pub fn with_seed(max_capacity: usize, sample_size: usize, seed: u64) -> Result<Self> {
        Self::with_rng(max_capacity, sample_size, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> HyperbolicCache<R> {
    /// Creates an empty cache drawing samples from `rng`.
    ///
    /// Fails when `sample_size` exceeds `max_capacity`, or when it is zero
    /// for a cache that can hold entries.
    pub fn with_rng(max_capacity: usize, sample_size: usize, rng: R) -> Result<Self> {
        if sample_size > max_capacity {
            return Err(CacheError::SampleSizeTooLarge {
                sample_size,
                max_capacity,
            });
        }
        if sample_size == 0 && max_capacity > 0 {
            return Err(CacheError::ZeroSampleSize(max_capacity));
        }

        Ok(Self {
            entries: HashMap::with_capacity(max_capacity),
            keys: Vec::with_capacity(max_capacity),
            max_capacity,
            used: 0,
            sample_size,
            rng,
            stats: CacheStats::new(),
        })
    }

    /// Number of candidates examined per eviction.
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Access count of a resident key.
    pub fn access_count(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.access_count)
    }

    /// Priority of a resident key at `now`.
    pub fn priority(&self, key: &str, now: Timestamp) -> Option<f64> {
        self.entries
            .get(key)
            .map(|entry| priority(entry.access_count, entry.inserted_at, now))
    }

    /// Drops the key at `slot` from the dense vector.
    fn release_slot(&mut self, slot: usize) -> String {
        let key = self.keys.swap_remove(slot);
        if let Some(moved) = self.keys.get(slot) {
            if let Some(entry) = self.entries.get_mut(moved) {
                entry.slot = slot;
            }
        }
        key
    }

    // == Evict ==
    /// Samples resident keys and evicts the one with the lowest priority.
    ///
    /// Ties keep the candidate sampled first.
    fn evict(&mut self, now: Timestamp) -> Option<String> {
        debug_assert!(!self.keys.is_empty(), "eviction from an empty cache");
        debug_assert_eq!(
            self.keys.len(),
            self.entries.len(),
            "key vector and entry map out of sync"
        );

        let amount = self.sample_size.min(self.keys.len());
        let mut victim: Option<(usize, f64)> = None;
        for slot in index::sample(&mut self.rng, self.keys.len(), amount).iter() {
            let sampled = self.entries.get(&self.keys[slot]);
            debug_assert!(sampled.is_some(), "key vector and entry map out of sync");
            let Some(entry) = sampled else {
                continue;
            };
            let candidate = priority(entry.access_count, entry.inserted_at, now);
            if victim.map_or(true, |(_, lowest)| candidate < lowest) {
                victim = Some((slot, candidate));
            }
        }

        let (slot, lowest) = victim?;
        let key = self.release_slot(slot);
        if let Some(entry) = self.entries.remove(&key) {
            self.used -= entry.weight;
        }
        self.stats.record_eviction();
        trace!(key = %key, priority = lowest, now, "hyperbolic evicted sampled key");
        Some(key)
    }

    /// Evicts until `incoming` more units fit.
    fn make_room(&mut self, incoming: usize, now: Timestamp) {
        while self.used + incoming > self.max_capacity {
            if self.evict(now).is_none() {
                break;
            }
        }
    }

    fn admit(&mut self, key: &str, entry: Entry) {
        let slot = self.keys.len();
        self.keys.push(key.to_string());
        self.used += entry.weight;
        self.entries.insert(key.to_string(), Entry { slot, ..entry });
    }
}

impl<R: Rng> Cache for HyperbolicCache<R> {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Hyperbolic
    }

    fn max_storage(&self) -> usize {
        self.max_capacity
    }

    fn used_storage(&self) -> usize {
        self.used
    }

    fn get(&mut self, key: &str) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.access_count = entry.access_count.saturating_add(1);
                self.stats.record_lookup(true)
            }
            None => self.stats.record_lookup(false),
        }
    }

    fn set_weighted(&mut self, timestamp: Timestamp, key: &str, weight: usize) -> bool {
        let weight = weight.max(1);
        if weight > self.max_capacity {
            return false;
        }

        // Pulled out of the sample pool while room is made for its new weight;
        // age is still measured from first admission
        if let Some(entry) = self.entries.remove(key) {
            self.release_slot(entry.slot);
            self.used -= entry.weight;
            self.make_room(weight, timestamp);
            self.admit(
                key,
                Entry {
                    access_count: entry.access_count.saturating_add(1),
                    weight,
                    ..entry
                },
            );
            return true;
        }

        self.make_room(weight, timestamp);
        self.admit(
            key,
            Entry {
                slot: 0,
                access_count: 1,
                inserted_at: timestamp,
                weight,
            },
        );
        true
    }

    fn remove(&mut self, key: &str) -> bool {
        let Some(entry) = self.entries.remove(key) else {
            return false;
        };
        self.release_slot(entry.slot);
        self.used -= entry.weight;
        true
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn stats(&self) -> CacheStats {
        self.stats
    }
}
