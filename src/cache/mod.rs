//! Time-to-live caching for lookups against slow services.
//!
//! Presence data, LDAP departments and Bugzilla session cookies are all cached
//! the same way: a flat map from sanitised key to value plus the time it was
//! stored. Entries older than the TTL are ignored by [`TtlCache::get`] but are
//! kept around, so a caller whose refresh failed can still fall back to the
//! last known value with [`TtlCache::get_stale`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

mod key;

pub use key::{cache_key, is_valid_key};

/// Default lifetime of a cached value: one day.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 3600);

/// A cached value with the time it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cached value
    pub value: V,
    /// When the value was stored
    pub stored_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    /// Create an entry stamped with the current time
    pub fn new(value: V) -> Self {
        Self {
            value,
            stored_at: Utc::now(),
        }
    }

    /// Whether the entry is still within `ttl`
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => self.stored_at + ttl > Utc::now(),
            // A TTL too large for chrono never expires.
            Err(_) => true,
        }
    }
}

/// Concurrent TTL map keyed by sanitised strings.
#[derive(Debug)]
pub struct TtlCache<V: Clone> {
    prefix: String,
    ttl: Duration,
    entries: DashMap<String, CacheEntry<V>>,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache whose keys are prefixed with `prefix` and that keeps
    /// values fresh for [`DEFAULT_TTL`].
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_ttl(prefix, DEFAULT_TTL)
    }

    /// Create a cache with a custom TTL
    pub fn with_ttl(prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            ttl,
            entries: DashMap::new(),
        }
    }

    /// The configured TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Full storage key for a user supplied key
    pub fn cache_key(&self, key: &str) -> String {
        cache_key(&self.prefix, key)
    }

    /// Remember a value
    pub fn set(&self, key: &str, value: V) {
        self.entries.insert(self.cache_key(key), CacheEntry::new(value));
    }

    /// Whether a value for `key` exists and has not expired
    pub fn is_fresh(&self, key: &str) -> bool {
        self.entries
            .get(&self.cache_key(key))
            .map(|entry| entry.is_fresh(self.ttl))
            .unwrap_or(false)
    }

    /// Value for `key` if it exists and has not expired
    pub fn get(&self, key: &str) -> Option<V> {
        self.entries
            .get(&self.cache_key(key))
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.value.clone())
    }

    /// Value for `key` regardless of its age
    pub fn get_stale(&self, key: &str) -> Option<V> {
        self.entries
            .get(&self.cache_key(key))
            .map(|entry| entry.value.clone())
    }

    /// Store an entry as is (used to seed caches, e.g. in tests)
    pub fn insert_entry(&self, key: &str, entry: CacheEntry<V>) {
        self.entries.insert(self.cache_key(key), entry);
    }

    /// Forget a value
    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries
            .remove(&self.cache_key(key))
            .map(|(_, entry)| entry.value)
    }

    /// Forget everything
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let cache: TtlCache<i32> = TtlCache::new("cache-");
        assert!(cache.get("empty").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_get() {
        let cache = TtlCache::new("cache-");
        cache.set("value", 42);
        assert_eq!(cache.get("value"), Some(42));
        assert!(cache.is_fresh("value"));
    }

    #[test]
    fn test_expired_entry_still_available_stale() {
        let cache = TtlCache::new("presence-");
        cache.insert_entry(
            "someone",
            CacheEntry {
                value: vec![1, 2],
                stored_at: Utc::now() - chrono::Duration::days(2),
            },
        );
        assert!(cache.get("someone").is_none());
        assert!(!cache.is_fresh("someone"));
        assert_eq!(cache.get_stale("someone"), Some(vec![1, 2]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_ttl_is_never_fresh() {
        let cache = TtlCache::with_ttl("x-", Duration::ZERO);
        cache.set("k", "v");
        assert!(cache.get("k").is_none());
        assert_eq!(cache.get_stale("k"), Some("v"));
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = TtlCache::new("x-");
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.remove("a"), Some(1));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_keys_with_spaces_are_hashed() {
        let cache = TtlCache::new("userinfo-");
        cache.set("John Doe", "L3");
        assert_eq!(cache.get("John Doe"), Some("L3"));
        assert!(!cache.cache_key("John Doe").contains(' '));
    }
}
