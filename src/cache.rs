//! Caching infrastructure for transient bot state
//!
//! Provides a TTL-based in-memory cache behind a small `Cache` trait so the
//! backing map of a store can be swapped (or faked in tests) without touching
//! the code that uses it.
//!
//! ## Usage Examples
//!
//! ```rust
//! use ticket_checkout_bot::cache::{Cache, MemoryCache};
//! use std::time::Duration;
//!
//! let cache: MemoryCache<u64, String> = MemoryCache::new();
//! cache.insert(1, "value".to_string(), Duration::from_secs(300));
//! assert_eq!(cache.get(&1), Some("value".to_string()));
//! ```

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Generic cache entry with expiration time
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached value
    pub value: T,
    /// When this entry expires
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    /// Create a new cache entry
    pub fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    /// Check if this entry has expired
    pub fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Generic cache trait
///
/// Implementations use interior mutability; every method takes `&self`.
pub trait Cache<K, V>: Send + Sync {
    /// Get a live value from the cache
    fn get(&self, key: &K) -> Option<V>;

    /// Insert a value into the cache, replacing any previous entry
    fn insert(&self, key: K, value: V, ttl: Duration);

    /// Return the live value for `key`, creating it with `make` when absent
    /// or expired. The entry's expiry is pushed out to `ttl` from now.
    fn get_or_insert_with(&self, key: K, ttl: Duration, make: &dyn Fn() -> V) -> V;

    /// Remove a value from the cache
    fn remove(&self, key: &K) -> Option<V>;

    /// Drop all expired entries, returning how many were removed
    fn cleanup(&self) -> usize;

    /// Get cache statistics
    fn stats(&self) -> CacheStats;

    /// Number of stored entries, expired ones included until cleanup
    fn len(&self) -> usize;

    /// Whether the cache holds no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all entries
    fn clear(&self);
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Total number of entries
    pub entries: usize,
    /// Number of hits
    pub hits: u64,
    /// Number of misses
    pub misses: u64,
    /// Number of entries removed because they expired
    pub evictions: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

/// Thread-safe in-memory cache implementation
pub struct MemoryCache<K, V> {
    data: RwLock<HashMap<K, CacheEntry<V>>>,
    stats: RwLock<CacheStats>,
}

impl<K, V> MemoryCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Create a new memory cache
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
        }
    }
}

impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        let data = self.data.read();
        let mut stats = self.stats.write();

        match data.get(key) {
            Some(entry) if !entry.is_expired() => {
                stats.hits += 1;
                Some(entry.value.clone())
            }
            _ => {
                stats.misses += 1;
                None
            }
        }
    }

    fn insert(&self, key: K, value: V, ttl: Duration) {
        self.data.write().insert(key, CacheEntry::new(value, ttl));
    }

    fn get_or_insert_with(&self, key: K, ttl: Duration, make: &dyn Fn() -> V) -> V {
        let mut data = self.data.write();
        let mut stats = self.stats.write();

        match data.get_mut(&key) {
            Some(entry) if !entry.is_expired() => {
                stats.hits += 1;
                entry.expires_at = Instant::now() + ttl;
                entry.value.clone()
            }
            _ => {
                stats.misses += 1;
                let value = make();
                data.insert(key, CacheEntry::new(value.clone(), ttl));
                value
            }
        }
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.data.write().remove(key).map(|entry| entry.value)
    }

    fn cleanup(&self) -> usize {
        let mut data = self.data.write();
        let initial_len = data.len();

        data.retain(|_, entry| !entry.is_expired());

        let removed = initial_len - data.len();
        if removed > 0 {
            self.stats.write().evictions += removed as u64;
            tracing::debug!("Cache cleanup removed {} expired entries", removed);
        }
        removed
    }

    fn stats(&self) -> CacheStats {
        let mut stats = self.stats.read().clone();
        stats.entries = self.data.read().len();

        let total_requests = stats.hits + stats.misses;
        if total_requests > 0 {
            stats.hit_rate = stats.hits as f64 / total_requests as f64;
        }

        stats
    }

    fn len(&self) -> usize {
        self.data.read().len()
    }

    fn clear(&self) {
        self.data.write().clear();
        *self.stats.write() = CacheStats::default();
    }
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_memory_cache_basic_operations() {
        let cache = MemoryCache::new();

        cache.insert("key1", "value1", Duration::from_secs(60));
        assert_eq!(cache.get(&"key1"), Some("value1"));
        assert_eq!(cache.get(&"key2"), None);

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_memory_cache_expiration() {
        let cache = MemoryCache::new();

        cache.insert("key1", "value1", Duration::from_millis(10));
        assert_eq!(cache.get(&"key1"), Some("value1"));

        thread::sleep(Duration::from_millis(20));

        assert_eq!(cache.get(&"key1"), None);
    }

    #[test]
    fn test_memory_cache_cleanup() {
        let cache = MemoryCache::new();

        cache.insert("key1", "value1", Duration::from_millis(10));
        cache.insert("key2", "value2", Duration::from_secs(60));

        thread::sleep(Duration::from_millis(20));

        assert_eq!(cache.cleanup(), 1);
        assert_eq!(cache.get(&"key1"), None);
        assert_eq!(cache.get(&"key2"), Some("value2"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_get_or_insert_with_creates_once() {
        let cache: MemoryCache<u64, u32> = MemoryCache::new();

        let first = cache.get_or_insert_with(7, Duration::from_secs(60), &|| 1);
        let second = cache.get_or_insert_with(7, Duration::from_secs(60), &|| 2);

        assert_eq!(first, 1);
        assert_eq!(second, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_or_insert_with_replaces_expired_entry() {
        let cache: MemoryCache<u64, u32> = MemoryCache::new();

        cache.insert(7, 1, Duration::from_millis(10));
        thread::sleep(Duration::from_millis(20));

        let value = cache.get_or_insert_with(7, Duration::from_secs(60), &|| 2);
        assert_eq!(value, 2);
    }

    #[test]
    fn test_get_or_insert_with_refreshes_ttl() {
        let cache: MemoryCache<u64, u32> = MemoryCache::new();

        cache.insert(7, 1, Duration::from_millis(30));
        thread::sleep(Duration::from_millis(15));
        cache.get_or_insert_with(7, Duration::from_secs(60), &|| 2);
        thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.get(&7), Some(1));
    }
}
