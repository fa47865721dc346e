//! Cache stores: where serialized entries live.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

/// Failures of the cache infrastructure. Never shown to API callers.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache backend unavailable: {message}")]
    Unavailable { message: String },

    #[error("Cache command failed: {message}")]
    Command { message: String },

    #[error("Cache operation timed out")]
    Timeout,

    #[error("Cache payload could not be encoded: {message}")]
    Encode { message: String },

    #[error("Cache payload could not be decoded: {message}")]
    Decode { message: String },
}

impl CacheError {
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
        }
    }
}

/// Key-value store for cache entries.
///
/// Deleting a missing key is not an error.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Arc<Vec<u8>>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError>;

    /// Delete every key starting with `prefix`. Returns how many were removed
    /// when the backend can tell.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError>;

    /// `"local"` or `"redis"`.
    fn mode(&self) -> &'static str;

    /// Whether the backend answers at all, for health reporting.
    async fn is_available(&self) -> bool {
        true
    }

    /// Drop entries whose TTL has run out and return how many were removed.
    /// Backends that expire entries themselves keep the default.
    fn cleanup_expired(&self) -> usize {
        0
    }
}

/// A cached entry with TTL support.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// Single-instance store backed by a `DashMap`.
///
/// Expired entries are dropped when read and by
/// [`cleanup_expired`](CacheStore::cleanup_expired), which the server runs
/// periodically.
#[derive(Clone, Debug, Default)]
pub struct LocalCacheStore {
    entries: Arc<DashMap<String, CachedEntry>>,
}

impl LocalCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl CacheStore for LocalCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Arc<Vec<u8>>>, CacheError> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                return Ok(Some(Arc::clone(&entry.data)));
            }
            drop(entry);
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), CachedEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        for key in keys {
            self.entries.remove(key);
        }
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before.saturating_sub(self.entries.len()))
    }

    fn mode(&self) -> &'static str {
        "local"
    }

    fn cleanup_expired(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            if entry.is_expired() {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    #[test]
    fn test_set_get_delete() {
        let store = LocalCacheStore::new();
        block_on(async {
            store
                .set("group:1", vec![1, 2, 3], Duration::from_secs(60))
                .await
                .unwrap();
            assert_eq!(
                store.get("group:1").await.unwrap().as_deref(),
                Some(&vec![1, 2, 3])
            );

            store.delete(&["group:1".to_string()]).await.unwrap();
            assert!(store.get("group:1").await.unwrap().is_none());

            // Deleting again is a no-op.
            store.delete(&["group:1".to_string()]).await.unwrap();
        });
    }

    #[tokio::test]
    async fn test_expired_entries_are_misses() {
        let store = LocalCacheStore::new();
        store
            .set("recipe:1", vec![9], Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(store.get("recipe:1").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let store = LocalCacheStore::new();
        for i in 0..100 {
            store
                .set(&format!("cache:/recipes:viewer={i}"), vec![1], Duration::from_millis(1))
                .await
                .unwrap();
        }
        store
            .set("group:1", vec![2], Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.cleanup_expired(), 100);
        assert_eq!(store.keys(), vec!["group:1"]);
        assert_eq!(store.cleanup_expired(), 0);
    }

    #[tokio::test]
    async fn test_delete_prefix() {
        let store = LocalCacheStore::new();
        let ttl = Duration::from_secs(60);
        for key in [
            "cache:/recipes",
            "cache:/recipes:scope=public&limit=10&skip=0",
            "cache:/groups:viewer=a",
            "recipe:1",
        ] {
            store.set(key, vec![0], ttl).await.unwrap();
        }
        let removed = store.delete_prefix("cache:/recipes:").await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(
            store.keys(),
            vec!["cache:/groups:viewer=a", "cache:/recipes", "recipe:1"]
        );
    }
}
