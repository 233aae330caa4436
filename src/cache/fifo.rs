//! FIFO Cache Module
//!
//! First-in first-out eviction: keys leave in the order they were admitted,
//! regardless of how often they are read or re-set.

use std::collections::{HashMap, VecDeque};

use tracing::trace;

use crate::cache::{Cache, CacheStats, PolicyKind, Timestamp};

// == FIFO Cache ==
/// Cache that evicts the oldest admitted key.
///
/// Keys are stored in a VecDeque where:
/// - Front = oldest admitted key (next victim)
/// - Back = newest admitted key
#[derive(Debug)]
pub struct FifoCache {
    /// Resident keys and their weights
    members: HashMap<String, usize>,
    /// Admission order
    order: VecDeque<String>,
    /// Maximum total weight
    max_capacity: usize,
    /// Total weight of resident keys
    used: usize,
    /// Lifetime counters
    stats: CacheStats,
}

impl FifoCache {
    // == Constructor ==
    /// Creates an empty FIFO cache holding at most `max_capacity` units.
    pub fn new(max_capacity: usize) -> Self {
        Self {
            members: HashMap::with_capacity(max_capacity),
            order: VecDeque::with_capacity(max_capacity),
            max_capacity,
            used: 0,
            stats: CacheStats::new(),
        }
    }

    // == Peek Oldest ==
    /// Returns the next key to be evicted without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.order.front().map(String::as_str)
    }

    // == Evict Oldest ==
    /// Removes the oldest key other than `keep`.
    fn evict(&mut self, keep: Option<&str>) -> Option<String> {
        debug_assert!(!self.members.is_empty(), "eviction from an empty cache");
        let position = self.order.iter().position(|k| Some(k.as_str()) != keep)?;
        let victim = self.order.remove(position)?;
        if let Some(weight) = self.members.remove(&victim) {
            self.used -= weight;
        }
        self.stats.record_eviction();
        trace!(key = %victim, "fifo evicted oldest key");
        Some(victim)
    }

    /// Evicts until `incoming` more units fit.
    fn make_room(&mut self, incoming: usize, keep: Option<&str>) {
        while self.used + incoming > self.max_capacity {
            if self.evict(keep).is_none() {
                break;
            }
        }
    }
}

impl Cache for FifoCache {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Fifo
    }

    fn max_storage(&self) -> usize {
        self.max_capacity
    }

    fn used_storage(&self) -> usize {
        self.used
    }

    fn get(&mut self, key: &str) -> bool {
        // Reads never change admission order
        let hit = self.members.contains_key(key);
        self.stats.record_lookup(hit)
    }

    fn set_weighted(&mut self, _timestamp: Timestamp, key: &str, weight: usize) -> bool {
        let weight = weight.max(1);
        if weight > self.max_capacity {
            return false;
        }

        // Position is fixed at first admission
        if let Some(previous) = self.members.get(key).copied() {
            self.used -= previous;
            self.make_room(weight, Some(key));
            self.used += weight;
            self.members.insert(key.to_string(), weight);
            return true;
        }

        self.make_room(weight, None);

        self.members.insert(key.to_string(), weight);
        self.order.push_back(key.to_string());
        self.used += weight;
        true
    }

    fn remove(&mut self, key: &str) -> bool {
        let Some(weight) = self.members.remove(key) else {
            return false;
        };
        self.used -= weight;
        self.order.retain(|k| k != key);
        true
    }

    fn contains(&self, key: &str) -> bool {
        self.members.contains_key(key)
    }

    fn len(&self) -> usize {
        self.members.len()
    }

    fn stats(&self) -> CacheStats {
        self.stats
    }
}
