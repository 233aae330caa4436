//! LRU Cache Module
//!
//! Least-recently-used eviction over an arena-backed doubly-linked list.
//!
//! ```text
//!   index: HashMap<String, SlotId>
//!
//!   head (LRU, next victim)                     tail (MRU)
//!     [k1] <──> [k2] <──> [k0] <──> ... <──> [kn]
//! ```
//!
//! Every touch (a `get` hit or a `set` on a resident key) unlinks the node
//! and relinks it at the tail, so recency order is total.

use std::collections::HashMap;

use tracing::trace;

use crate::cache::arena::{SlotArena, SlotId};
use crate::cache::{Cache, CacheStats, PolicyKind, Timestamp};

#[derive(Debug)]
struct Node {
    key: String,
    weight: usize,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

// == LRU Cache ==
/// Cache that evicts the least recently used key.
#[derive(Debug)]
pub struct LruCache {
    /// Key to list node
    index: HashMap<String, SlotId>,
    /// List nodes
    nodes: SlotArena<Node>,
    /// Least recently used
    head: Option<SlotId>,
    /// Most recently used
    tail: Option<SlotId>,
    max_capacity: usize,
    /// Total weight of resident keys
    used: usize,
    stats: CacheStats,
}

impl LruCache {
    // == Constructor ==
    /// Creates an empty LRU cache holding at most `max_capacity` units.
    pub fn new(max_capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(max_capacity),
            nodes: SlotArena::with_capacity(max_capacity),
            head: None,
            tail: None,
            max_capacity,
            used: 0,
            stats: CacheStats::new(),
        }
    }

    // == Peek LRU ==
    /// Returns the next key to be evicted without removing it.
    pub fn peek_lru(&self) -> Option<&str> {
        self.head
            .and_then(|id| self.nodes.get(id))
            .map(|node| node.key.as_str())
    }

    /// Keys from least to most recently used.
    pub fn recency_order(&self) -> Vec<&str> {
        let mut keys = Vec::with_capacity(self.index.len());
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let Some(node) = self.nodes.get(id) else {
                break;
            };
            keys.push(node.key.as_str());
            cursor = node.next;
        }
        keys
    }

    fn unlink(&mut self, id: SlotId) {
        let (prev, next) = match self.nodes.get(id) {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(prev_id) => {
                if let Some(node) = self.nodes.get_mut(prev_id) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(next_id) => {
                if let Some(node) = self.nodes.get_mut(next_id) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = self.nodes.get_mut(id) {
            node.prev = None;
            node.next = None;
        }
    }

    fn link_back(&mut self, id: SlotId) {
        let old_tail = self.tail;
        if let Some(node) = self.nodes.get_mut(id) {
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(tail_id) => {
                if let Some(node) = self.nodes.get_mut(tail_id) {
                    node.next = Some(id);
                }
            }
            None => self.head = Some(id),
        }
        self.tail = Some(id);
    }

    // == Touch ==
    /// Marks a node as most recently used.
    fn touch(&mut self, id: SlotId) {
        if self.tail == Some(id) {
            return;
        }
        self.unlink(id);
        self.link_back(id);
    }

    // == Evict ==
    /// Removes the least recently used key other than `keep`.
    fn evict(&mut self, keep: Option<SlotId>) -> Option<String> {
        debug_assert!(!self.index.is_empty(), "eviction from an empty cache");
        debug_assert_eq!(self.nodes.len(), self.index.len(), "arena and index out of sync");
        let head = self.head?;
        let id = if Some(head) == keep {
            self.nodes.get(head)?.next?
        } else {
            head
        };
        self.unlink(id);
        let node = self.nodes.remove(id)?;
        self.index.remove(&node.key);
        self.used -= node.weight;
        self.stats.record_eviction();
        trace!(key = %node.key, "lru evicted least recently used key");
        Some(node.key)
    }

    /// Evicts until `incoming` more units fit.
    fn make_room(&mut self, incoming: usize, keep: Option<SlotId>) {
        while self.used + incoming > self.max_capacity {
            if self.evict(keep).is_none() {
                break;
            }
        }
    }

    /// Panics if the index and the list disagree.
    #[cfg(test)]
    fn debug_validate_invariants(&self) {
        let order = self.recency_order();
        assert_eq!(order.len(), self.index.len());
        assert_eq!(self.nodes.len(), self.index.len());
        for key in order {
            let id = self.index[key];
            assert_eq!(self.nodes.get(id).map(|n| n.key.as_str()), Some(key));
        }
        let weight: usize = self
            .index
            .values()
            .filter_map(|&id| self.nodes.get(id))
            .map(|node| node.weight)
            .sum();
        assert_eq!(weight, self.used);
        assert!(self.used <= self.max_capacity);
    }
}

impl Cache for LruCache {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Lru
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
                self.touch(id);
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
            self.touch(id);
            let previous = self.nodes.get(id).map_or(0, |node| node.weight);
            self.used -= previous;
            self.make_room(weight, Some(id));
            if let Some(node) = self.nodes.get_mut(id) {
                node.weight = weight;
            }
            self.used += weight;
            return true;
        }

        self.make_room(weight, None);

        let id = self.nodes.insert(Node {
            key: key.to_string(),
            weight,
            prev: None,
            next: None,
        });
        self.link_back(id);
        self.index.insert(key.to_string(), id);
        self.used += weight;
        true
    }

    fn remove(&mut self, key: &str) -> bool {
        let Some(id) = self.index.remove(key) else {
            return false;
        };
        self.unlink(id);
        if let Some(node) = self.nodes.remove(id) {
            self.used -= node.weight;
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

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_new() {
        let lru = LruCache::new(3);
        assert!(lru.is_empty());
        assert_eq!(lru.peek_lru(), None);
        assert!(lru.recency_order().is_empty());
    }

    #[test]
    fn test_lru_get_refreshes_recency() {
        let mut lru = LruCache::new(3);
        lru.set(0, "k0");
        lru.set(1, "k1");
        lru.set(2, "k2");

        assert!(lru.get("k0"));
        lru.set(3, "k3");

        assert!(lru.contains("k0"));
        assert!(!lru.contains("k1"));
        assert!(lru.contains("k2"));
        assert!(lru.contains("k3"));
        lru.debug_validate_invariants();
    }

    #[test]
    fn test_lru_set_existing_is_a_use() {
        let mut lru = LruCache::new(3);
        lru.set(0, "a");
        lru.set(0, "b");
        lru.set(0, "c");
        lru.set(0, "a");

        assert_eq!(lru.recency_order(), vec!["b", "c", "a"]);
        assert_eq!(lru.len(), 3);

        lru.set(0, "d");
        assert!(!lru.contains("b"));
        assert_eq!(lru.peek_lru(), Some("c"));
    }

    #[test]
    fn test_lru_order_after_multiple_touches() {
        let mut lru = LruCache::new(3);
        lru.set(0, "a");
        lru.set(0, "b");
        lru.set(0, "c");

        lru.get("a");
        lru.get("c");
        lru.get("b");

        assert_eq!(lru.recency_order(), vec!["a", "c", "b"]);

        lru.set(0, "d");
        assert_eq!(lru.recency_order(), vec!["c", "b", "d"]);
        lru.set(0, "e");
        assert_eq!(lru.recency_order(), vec!["b", "d", "e"]);
        lru.debug_validate_invariants();
    }

    #[test]
    fn test_lru_touch_tail_is_noop() {
        let mut lru = LruCache::new(2);
        lru.set(0, "a");
        lru.set(0, "b");
        assert!(lru.get("b"));
        assert_eq!(lru.recency_order(), vec!["a", "b"]);
    }

    #[test]
    fn test_lru_remove_middle_head_and_tail() {
        let mut lru = LruCache::new(4);
        for key in ["a", "b", "c", "d"] {
            lru.set(0, key);
        }

        assert!(lru.remove("b"));
        assert_eq!(lru.recency_order(), vec!["a", "c", "d"]);
        assert!(lru.remove("a"));
        assert_eq!(lru.peek_lru(), Some("c"));
        assert!(lru.remove("d"));
        assert_eq!(lru.recency_order(), vec!["c"]);
        assert!(!lru.remove("d"));
        lru.debug_validate_invariants();

        assert!(lru.remove("c"));
        assert!(lru.is_empty());
        assert_eq!(lru.peek_lru(), None);

        // List is usable after draining
        lru.set(0, "e");
        assert_eq!(lru.recency_order(), vec!["e"]);
    }

    #[test]
    fn test_lru_stats() {
        let mut lru = LruCache::new(1);
        lru.set(0, "a");
        lru.get("a");
        lru.set(0, "b");
        lru.get("a");

        let stats = lru.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
    }

    #[test]
    fn test_lru_zero_capacity() {
        let mut lru = LruCache::new(0);
        assert!(!lru.set(0, "a"));
        assert!(!lru.get("a"));
    }

    #[test]
    fn test_lru_weighted_evicts_until_fit() {
        let mut lru = LruCache::new(10);
        lru.set_weighted(0, "a", 3);
        lru.set_weighted(1, "b", 3);
        lru.set_weighted(2, "c", 4);
        assert!(lru.get("a"));

        // Order is b, c, a; 5 units needs b and c gone
        assert!(lru.set_weighted(3, "d", 5));
        assert_eq!(lru.recency_order(), vec!["a", "d"]);
        assert_eq!(lru.used_storage(), 8);
        assert_eq!(lru.remaining_storage(), 2);
        assert_eq!(lru.stats().evictions, 2);
        lru.debug_validate_invariants();
    }

    #[test]
    fn test_lru_weighted_rejects_oversized() {
        let mut lru = LruCache::new(4);
        lru.set_weighted(0, "a", 4);
        assert!(!lru.set_weighted(1, "b", 5));
        assert!(lru.contains("a"));
        assert_eq!(lru.used_storage(), 4);
    }

    #[test]
    fn test_lru_weighted_reset_keeps_own_key() {
        let mut lru = LruCache::new(5);
        lru.set_weighted(0, "a", 1);
        lru.set_weighted(1, "b", 2);
        lru.set_weighted(2, "c", 2);

        assert!(lru.set_weighted(3, "c", 3));
        assert_eq!(lru.recency_order(), vec!["b", "c"]);
        assert_eq!(lru.used_storage(), 5);

        assert!(lru.set_weighted(4, "c", 5));
        assert_eq!(lru.recency_order(), vec!["c"]);
        assert_eq!(lru.used_storage(), 5);

        // Nothing but the key itself is resident
        assert!(lru.set_weighted(5, "c", 4));
        assert_eq!(lru.recency_order(), vec!["c"]);
        assert_eq!(lru.used_storage(), 4);
        assert_eq!(lru.stats().evictions, 2);
        lru.debug_validate_invariants();
    }
}
