//! LFU Cache Module
//!
//! Least-frequently-used eviction with O(1) promotion and eviction.
//!
//! ```text
//!   lowest
//!     │
//!     ▼
//!   ┌──────────┐      ┌──────────┐      ┌──────────┐
//!   │ count=1  │ ───► │ count=3  │ ───► │ count=7  │
//!   │ k2 k4 k3 │ ◄─── │ k1       │ ◄─── │ k0       │
//!   └──────────┘      └──────────┘      └──────────┘
//! ```
//!
//! Buckets are kept in ascending access-count order and only exist while
//! they hold at least one key. Promoting a key moves it to the bucket for
//! `count + 1`, creating that bucket right after the current one when it is
//! missing. Eviction takes a key from the lowest bucket.
//!
//! Ties inside the lowest bucket go to the key that entered the bucket
//! first. Any member of that bucket is an equally valid victim; the arrival
//! order only makes the choice reproducible.

use std::collections::HashMap;

use tracing::trace;

use crate::cache::arena::{SlotArena, SlotId};
use crate::cache::{Cache, CacheStats, PolicyKind, Timestamp};

#[derive(Debug)]
struct Entry {
    key: String,
    count: u64,
    weight: usize,
    bucket: SlotId,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

#[derive(Debug)]
struct Bucket {
    count: u64,
    len: usize,
    /// Earliest arrival, evicted first
    head: Option<SlotId>,
    tail: Option<SlotId>,
    /// Neighbouring buckets with lower / higher counts
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

// == LFU Cache ==
/// Cache that evicts from the lowest access-count bucket.
#[derive(Debug)]
pub struct LfuCache {
    index: HashMap<String, SlotId>,
    entries: SlotArena<Entry>,
    buckets: SlotArena<Bucket>,
    /// Bucket with the lowest count
    lowest: Option<SlotId>,
    max_capacity: usize,
    /// Total weight of resident keys
    used: usize,
    stats: CacheStats,
}

impl LfuCache {
    // == Constructor ==
    /// Creates an empty LFU cache holding at most `max_capacity` units.
    pub fn new(max_capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(max_capacity),
            entries: SlotArena::with_capacity(max_capacity),
            buckets: SlotArena::with_capacity(16),
            lowest: None,
            max_capacity,
            used: 0,
            stats: CacheStats::new(),
        }
    }

    /// Access count of a resident key.
    pub fn frequency(&self, key: &str) -> Option<u64> {
        let id = *self.index.get(key)?;
        self.entries.get(id).map(|entry| entry.count)
    }

    /// Lowest access count currently resident.
    pub fn min_frequency(&self) -> Option<u64> {
        self.lowest
            .and_then(|id| self.buckets.get(id))
            .map(|bucket| bucket.count)
    }

    /// `(count, members)` for every bucket, lowest count first.
    pub fn bucket_sizes(&self) -> Vec<(u64, usize)> {
        let mut sizes = Vec::new();
        let mut cursor = self.lowest;
        while let Some(id) = cursor {
            let Some(bucket) = self.buckets.get(id) else {
                break;
            };
            sizes.push((bucket.count, bucket.len));
            cursor = bucket.next;
        }
        sizes
    }

    // == Bucket List ==
    /// Creates an empty bucket right after `prev`, or at the front.
    fn insert_bucket_after(&mut self, prev: Option<SlotId>, count: u64) -> SlotId {
        let next = match prev {
            Some(prev_id) => self.buckets.get(prev_id).and_then(|b| b.next),
            None => self.lowest,
        };
        let id = self.buckets.insert(Bucket {
            count,
            len: 0,
            head: None,
            tail: None,
            prev,
            next,
        });

        match prev {
            Some(prev_id) => {
                if let Some(bucket) = self.buckets.get_mut(prev_id) {
                    bucket.next = Some(id);
                }
            }
            None => self.lowest = Some(id),
        }
        if let Some(next_id) = next {
            if let Some(bucket) = self.buckets.get_mut(next_id) {
                bucket.prev = Some(id);
            }
        }
        id
    }

    fn remove_bucket(&mut self, id: SlotId) {
        let Some(bucket) = self.buckets.remove(id) else {
            return;
        };
        debug_assert_eq!(bucket.len, 0, "removing a non-empty bucket");

        match bucket.prev {
            Some(prev_id) => {
                if let Some(prev) = self.buckets.get_mut(prev_id) {
                    prev.next = bucket.next;
                }
            }
            None => self.lowest = bucket.next,
        }
        if let Some(next_id) = bucket.next {
            if let Some(next) = self.buckets.get_mut(next_id) {
                next.prev = bucket.prev;
            }
        }
    }

    // == Bucket Membership ==
    /// Appends an entry to a bucket and adopts the bucket's count.
    fn attach(&mut self, id: SlotId, bucket_id: SlotId) {
        let (tail, count) = match self.buckets.get(bucket_id) {
            Some(bucket) => (bucket.tail, bucket.count),
            None => return,
        };

        if let Some(entry) = self.entries.get_mut(id) {
            entry.bucket = bucket_id;
            entry.count = count;
            entry.prev = tail;
            entry.next = None;
        }
        if let Some(tail_id) = tail {
            if let Some(entry) = self.entries.get_mut(tail_id) {
                entry.next = Some(id);
            }
        }
        if let Some(bucket) = self.buckets.get_mut(bucket_id) {
            if bucket.head.is_none() {
                bucket.head = Some(id);
            }
            bucket.tail = Some(id);
            bucket.len += 1;
        }
    }

    /// Unlinks an entry from its bucket, dropping the bucket once empty.
    fn detach(&mut self, id: SlotId) {
        let (bucket_id, prev, next) = match self.entries.get(id) {
            Some(entry) => (entry.bucket, entry.prev, entry.next),
            None => return,
        };

        if let Some(prev_id) = prev {
            if let Some(entry) = self.entries.get_mut(prev_id) {
                entry.next = next;
            }
        }
        if let Some(next_id) = next {
            if let Some(entry) = self.entries.get_mut(next_id) {
                entry.prev = prev;
            }
        }
        if let Some(entry) = self.entries.get_mut(id) {
            entry.prev = None;
            entry.next = None;
        }

        let empty = match self.buckets.get_mut(bucket_id) {
            Some(bucket) => {
                if prev.is_none() {
                    bucket.head = next;
                }
                if next.is_none() {
                    bucket.tail = prev;
                }
                bucket.len -= 1;
                bucket.len == 0
            }
            None => false,
        };
        if empty {
            self.remove_bucket(bucket_id);
        }
    }

    // == Promote ==
    /// Moves an entry to the bucket for its next access count.
    fn promote(&mut self, id: SlotId) {
        let (current, count) = match self.entries.get(id) {
            Some(entry) => (entry.bucket, entry.count),
            None => return,
        };
        let next_count = count.saturating_add(1);
        if next_count == count {
            return;
        }

        let following = self.buckets.get(current).and_then(|b| b.next);
        let target = match following {
            Some(next_id) if self.buckets.get(next_id).map(|b| b.count) == Some(next_count) => {
                next_id
            }
            _ => self.insert_bucket_after(Some(current), next_count),
        };

        self.detach(id);
        self.attach(id, target);
    }

    // == Evict ==
    /// First entry in eviction order other than `keep`: lowest bucket
    /// first, earliest arrival first within a bucket.
    fn victim(&self, keep: Option<SlotId>) -> Option<SlotId> {
        let mut bucket_cursor = self.lowest;
        while let Some(bucket_id) = bucket_cursor {
            let bucket = self.buckets.get(bucket_id)?;
            let mut cursor = bucket.head;
            while let Some(id) = cursor {
                if Some(id) != keep {
                    return Some(id);
                }
                cursor = self.entries.get(id)?.next;
            }
            bucket_cursor = bucket.next;
        }
        None
    }

    /// Removes the earliest arrival from the lowest bucket, skipping `keep`.
    fn evict(&mut self, keep: Option<SlotId>) -> Option<String> {
        debug_assert!(!self.index.is_empty(), "eviction from an empty cache");
        debug_assert_eq!(self.entries.len(), self.index.len(), "arena and index out of sync");
        let victim = self.victim(keep)?;
        self.detach(victim);
        let entry = self.entries.remove(victim)?;
        self.index.remove(&entry.key);
        self.used -= entry.weight;
        self.stats.record_eviction();
        trace!(key = %entry.key, count = entry.count, "lfu evicted least frequently used key");
        Some(entry.key)
    }

    /// Evicts until `incoming` more units fit.
    fn make_room(&mut self, incoming: usize, keep: Option<SlotId>) {
        while self.used + incoming > self.max_capacity {
            if self.evict(keep).is_none() {
                break;
            }
        }
    }

    /// Panics if the index, the entries and the buckets disagree.
    #[cfg(test)]
    fn debug_validate_invariants(&self) {
        assert_eq!(self.entries.len(), self.index.len());
        let mut members = 0;
        let mut last_count = 0;
        let mut cursor = self.lowest;
        while let Some(bucket_id) = cursor {
            let bucket = self.buckets.get(bucket_id).unwrap();
            assert!(bucket.count > last_count, "buckets out of order");
            assert!(bucket.len > 0, "empty bucket left in list");
            last_count = bucket.count;

            let mut walked = 0;
            let mut entry_cursor = bucket.head;
            while let Some(entry_id) = entry_cursor {
                let entry = self.entries.get(entry_id).unwrap();
                assert_eq!(entry.bucket, bucket_id);
                assert_eq!(entry.count, bucket.count);
                assert_eq!(self.index.get(&entry.key), Some(&entry_id));
                walked += 1;
                entry_cursor = entry.next;
            }
            assert_eq!(walked, bucket.len);
            members += walked;
            cursor = bucket.next;
        }
        assert_eq!(members, self.index.len());
        let weight: usize = self
            .index
            .values()
            .filter_map(|&id| self.entries.get(id))
            .map(|entry| entry.weight)
            .sum();
        assert_eq!(weight, self.used);
        assert!(self.used <= self.max_capacity);
        assert_eq!(
            self.buckets.len(),
            self.bucket_sizes().len(),
            "orphaned bucket"
        );
    }
}

impl Cache for LfuCache {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Lfu
    }

    fn max_storage(&self) -> usize {
        self.max_capacity
    }

    fn used_storage(&self) -> usize {
        self.used
    }

    fn get(&mut self, key: &str) -> bool {
        match self.index.get(key).copied() {
            Some(id) => {
                self.promote(id);
                self.stats.record_lookup(true)
            }
            None => self.stats.record_lookup(false),
        }
    }

    fn set_weighted(&mut self, _timestamp: Timestamp, key: &str, weight: usize) -> bool {
        let weight = weight.max(1);
        if weight > self.max_capacity {
            return false;
        }

        if let Some(id) = self.index.get(key).copied() {
            self.promote(id);
            let previous = self.entries.get(id).map_or(0, |entry| entry.weight);
            self.used -= previous;
            self.make_room(weight, Some(id));
            if let Some(entry) = self.entries.get_mut(id) {
                entry.weight = weight;
            }
            self.used += weight;
            return true;
        }

        self.make_room(weight, None);

        let front = match self.lowest {
            Some(id) if self.buckets.get(id).map(|b| b.count) == Some(1) => id,
            _ => self.insert_bucket_after(None, 1),
        };
        let id = self.entries.insert(Entry {
            key: key.to_string(),
            count: 1,
            weight,
            bucket: front,
            prev: None,
            next: None,
        });
        self.attach(id, front);
        self.index.insert(key.to_string(), id);
        self.used += weight;
        true
    }

    fn remove(&mut self, key: &str) -> bool {
        let Some(id) = self.index.remove(key) else {
            return false;
        };
        self.detach(id);
        if let Some(entry) = self.entries.remove(id) {
            self.used -= entry.weight;
        }
        true
    }

    fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn stats(&self) -> CacheStats {
        self.stats
    }
}
