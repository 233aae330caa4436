//! Shared Cache Module
//!
//! Thread-safe handle around any policy. Each call takes the cache's single
//! exclusive lock for its whole duration; lookups mutate policy state, so
//! there is no read-only path.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::{Cache, CacheStats, PolicyKind, Timestamp};

// == Shared Cache ==
/// Cloneable handle to one cache instance guarded by one mutex.
#[derive(Clone)]
pub struct SharedCache {
    inner: Arc<Mutex<Box<dyn Cache + Send>>>,
}

impl SharedCache {
    // == Constructor ==
    /// Wraps a cache so it can be shared across threads.
    pub fn new(cache: Box<dyn Cache + Send>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// Runs `f` with the lock held.
    pub fn with<T>(&self, f: impl FnOnce(&mut dyn Cache) -> T) -> T {
        let mut guard = self.inner.lock();
        f(&mut **guard)
    }

    pub fn kind(&self) -> PolicyKind {
        self.inner.lock().kind()
    }

    pub fn max_storage(&self) -> usize {
        self.inner.lock().max_storage()
    }

    pub fn used_storage(&self) -> usize {
        self.inner.lock().used_storage()
    }

    pub fn remaining_storage(&self) -> usize {
        self.inner.lock().remaining_storage()
    }

    pub fn get(&self, key: &str) -> bool {
        self.inner.lock().get(key)
    }

    pub fn set(&self, timestamp: Timestamp, key: &str) -> bool {
        self.inner.lock().set(timestamp, key)
    }

    pub fn set_weighted(&self, timestamp: Timestamp, key: &str, weight: usize) -> bool {
        self.inner.lock().set_weighted(timestamp, key, weight)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.inner.lock().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }
}

impl From<Box<dyn Cache + Send>> for SharedCache {
    fn from(cache: Box<dyn Cache + Send>) -> Self {
        Self::new(cache)
    }
}

impl fmt::Debug for SharedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.inner.lock();
        f.debug_struct("SharedCache")
            .field("kind", &cache.kind())
            .field("len", &cache.len())
            .field("max_storage", &cache.max_storage())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LruCache;
    use std::thread;

    #[test]
    fn test_shared_cache_delegates() {
        let cache = SharedCache::new(Box::new(LruCache::new(2)));
        assert_eq!(cache.kind(), PolicyKind::Lru);
        assert!(cache.set(0, "a"));
        assert!(cache.get("a"));
        assert!(!cache.get("b"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.remaining_storage(), 1);
        assert!(cache.remove("a"));
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn test_shared_cache_weighted() {
        let cache: SharedCache = PolicyKind::Fifo.build(10, 0, None).unwrap().into();
        assert!(cache.set_weighted(0, "a", 6));
        assert!(cache.set_weighted(1, "b", 6));
        assert!(!cache.contains("a"));
        assert_eq!(cache.used_storage(), 6);
        assert_eq!(cache.remaining_storage(), 4);
        assert!(!cache.set_weighted(2, "c", 11));
    }

    #[test]
    fn test_shared_cache_concurrent_access() {
        let cache: SharedCache = PolicyKind::Lfu.build(64, 0, None).unwrap().into();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for i in 0..250u64 {
                        let key = format!("k{}", (i * 7 + t) % 100);
                        if !cache.get(&key) {
                            cache.set(i, &key);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.lookups(), 1000);
        assert!(cache.len() <= cache.max_storage());
        assert_eq!(cache.with(|c| c.len()), cache.len());
    }
}
