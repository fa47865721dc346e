//! Cache-aside reads and post-commit invalidation.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use recipebox_storage::Lookup;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::keys::InvalidationSet;
use super::store::{CacheError, CacheStore};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// A value the coordinator may put in the cache.
pub trait CacheValue: Serialize + DeserializeOwned + Send {
    /// Values for which this returns `false` are returned to the caller but
    /// not stored.
    fn is_cacheable(&self) -> bool {
        true
    }
}

impl<T: Serialize + DeserializeOwned + Send> CacheValue for Vec<T> {}

impl<T: Serialize + DeserializeOwned + Send> CacheValue for Lookup<T> {
    fn is_cacheable(&self) -> bool {
        self.is_found()
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    invalidations: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub mode: &'static str,
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub invalidations: u64,
}

/// Wraps reads and writes with the cache.
///
/// The cache is an accelerator only. Every failure of the store (unreachable,
/// slow, undecodable payload) is logged and the caller gets data from the
/// loader, i.e. from the system of record.
///
/// A read that misses, loads a pre-write value and stores it after a
/// concurrent writer's invalidation leaves a stale entry until its TTL runs
/// out. That window is accepted and bounded by the TTL.
#[derive(Clone)]
pub struct CacheCoordinator {
    store: Arc<dyn CacheStore>,
    default_ttl: Duration,
    op_timeout: Duration,
    counters: Arc<Counters>,
}

impl CacheCoordinator {
    pub fn new(store: Arc<dyn CacheStore>, default_ttl: Duration, op_timeout: Duration) -> Self {
        Self {
            store,
            default_ttl,
            op_timeout,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Return the cached value for `key`, or run `loader`, cache its result
    /// with the default TTL and return it.
    ///
    /// # Errors
    /// Only errors from `loader` are returned.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, loader: F) -> Result<T, E>
    where
        T: CacheValue,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_load_with_ttl(key, self.default_ttl, loader)
            .await
    }

    pub async fn get_or_load_with_ttl<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> Result<T, E>
    where
        T: CacheValue,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.lookup::<T>(key).await {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, "cache hit");
            return Ok(value);
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = %key, "cache miss");

        let value = loader().await?;
        if value.is_cacheable() {
            self.put(key, &value, ttl).await;
        }
        Ok(value)
    }

    /// Drop every key in `set`. Call only after the write has committed.
    pub async fn invalidate(&self, set: &InvalidationSet) {
        if set.is_empty() {
            return;
        }
        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);

        let keys = set.exact_keys();
        if let Err(e) = self.bounded(self.store.delete(&keys)).await {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(keys = ?keys, error = %e, "cache invalidation failed");
        }

        for prefix in set.prefixes() {
            match self.bounded(self.store.delete_prefix(&prefix)).await {
                Ok(removed) => {
                    tracing::debug!(prefix = %prefix, removed, "cache prefix invalidated");
                }
                Err(e) => {
                    self.counters.errors.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(prefix = %prefix, error = %e, "cache prefix invalidation failed");
                }
            }
        }
    }

    /// Whether the store answers within the operation timeout.
    pub async fn is_available(&self) -> bool {
        tokio::time::timeout(self.op_timeout, self.store.is_available())
            .await
            .unwrap_or(false)
    }

    /// Periodically drop expired entries from stores that keep them.
    pub fn start_cleanup_task(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let removed = store.cleanup_expired();
                if removed > 0 {
                    tracing::debug!(removed, "expired cache entries swept");
                }
            }
        })
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            mode: self.store.mode(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.bounded(self.store.get(key)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key, error = %e, "cache read failed, loading from source");
                return None;
            }
        };

        match decode::<T>(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key, error = %e, "dropping undecodable cache entry");
                if let Err(e) = self.bounded(self.store.delete(&[key.to_string()])).await {
                    tracing::warn!(key = %key, error = %e, "failed to drop undecodable entry");
                }
                None
            }
        }
    }

    async fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let bytes = match encode(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key, error = %e, "cache write skipped");
                return;
            }
        };
        if let Err(e) = self.bounded(self.store.set(key, bytes, ttl)).await {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(key = %key, error = %e, "cache write failed");
        }
    }

    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .unwrap_or(Err(CacheError::Timeout))
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CacheError> {
    rmp_serde::to_vec(value).map_err(|e| CacheError::Encode {
        message: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CacheError> {
    rmp_serde::from_slice(bytes).map_err(|e| CacheError::Decode {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys::{ListQuery, ViewerScope, paths};
    use crate::cache::store::LocalCacheStore;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    fn coordinator(store: Arc<dyn CacheStore>) -> CacheCoordinator {
        CacheCoordinator::new(store, DEFAULT_TTL, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let store = Arc::new(LocalCacheStore::new());
        let cache = coordinator(store.clone());
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Vec<String> = cache
                .get_or_load("cache:/things", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(vec!["a".to_string()])
                })
                .await
                .unwrap();
            assert_eq!(value, vec!["a"]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (2, 1));
        assert_eq!(stats.mode, "local");
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let store = Arc::new(LocalCacheStore::new());
        let cache = coordinator(store.clone());

        let value: Lookup<String> = cache
            .get_or_load("group:x", || async { Ok::<_, ()>(Lookup::NotFound) })
            .await
            .unwrap();
        assert_eq!(value, Lookup::NotFound);
        assert!(!store.contains_key("group:x"));

        let value: Lookup<String> = cache
            .get_or_load("group:x", || async { Ok::<_, ()>(Lookup::Found("g".into())) })
            .await
            .unwrap();
        assert_eq!(value, Lookup::Found("g".to_string()));
        assert!(store.contains_key("group:x"));
    }

    #[tokio::test]
    async fn test_loader_error_is_returned_and_not_cached() {
        let store = Arc::new(LocalCacheStore::new());
        let cache = coordinator(store.clone());
        let result: Result<Vec<u8>, &str> = cache
            .get_or_load("cache:/boom", || async { Err("db down") })
            .await;
        assert_eq!(result, Err("db down"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_replaced() {
        let store = Arc::new(LocalCacheStore::new());
        store
            .set("cache:/bad", vec![0xc1], DEFAULT_TTL)
            .await
            .unwrap();
        let cache = coordinator(store.clone());
        let value: Vec<u32> = cache
            .get_or_load("cache:/bad", || async { Ok::<_, ()>(vec![7]) })
            .await
            .unwrap();
        assert_eq!(value, vec![7]);
        assert_eq!(cache.stats().errors, 1);
    }

    #[tokio::test]
    async fn test_cleanup_task_sweeps_expired_entries() {
        let store = Arc::new(LocalCacheStore::new());
        let cache = CacheCoordinator::new(
            store.clone(),
            Duration::from_millis(1),
            Duration::from_millis(200),
        );
        for page in 0..50 {
            let key = format!("cache:/recipes:scope=public&skip={page}");
            let _: Vec<u8> = cache
                .get_or_load(&key, || async { Ok::<_, ()>(vec![1]) })
                .await
                .unwrap();
        }
        assert_eq!(store.len(), 50);

        let task = cache.start_cleanup_task(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;
        task.abort();
        assert!(store.is_empty());
    }

    #[test]
    fn test_decode_failure_is_a_cache_error() {
        let err = decode::<Vec<u32>>(&[0xc1]).unwrap_err();
        assert!(matches!(err, CacheError::Decode { .. }));
        assert_eq!(decode::<Vec<u32>>(&encode(&vec![3u32]).unwrap()).unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_invalidate_exact_and_prefix() {
        let store = Arc::new(LocalCacheStore::new());
        let cache = coordinator(store.clone());
        let user = recipebox_core::UserId::new();
        let list_key = ListQuery::new(paths::RECIPES)
            .scoped(ViewerScope::User(user))
            .page(recipebox_core::Page::default())
            .key();

        for key in ["recipe:1", "recipe:2", list_key.as_str()] {
            let _: Vec<u8> = cache
                .get_or_load(key, || async { Ok::<_, ()>(vec![1]) })
                .await
                .unwrap();
        }

        let set = InvalidationSet::new().key("recipe:1").list(paths::RECIPES);
        cache.invalidate(&set).await;

        assert!(!store.contains_key("recipe:1"));
        assert!(store.contains_key("recipe:2"));
        assert!(!store.contains_key(&list_key));
        // Invalidating again is a no-op.
        cache.invalidate(&set).await;
        assert_eq!(cache.stats().errors, 0);
    }

    /// A store whose every operation fails.
    struct DownStore;

    #[async_trait]
    impl CacheStore for DownStore {
        async fn get(&self, _key: &str) -> Result<Option<Arc<Vec<u8>>>, CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }
        async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }
        async fn delete(&self, _keys: &[String]) -> Result<(), CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }
        async fn delete_prefix(&self, _prefix: &str) -> Result<usize, CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }
        fn mode(&self) -> &'static str {
            "down"
        }
    }

    /// A store that never answers.
    struct HangingStore;

    #[async_trait]
    impl CacheStore for HangingStore {
        async fn get(&self, _key: &str) -> Result<Option<Arc<Vec<u8>>>, CacheError> {
            std::future::pending().await
        }
        async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
            std::future::pending().await
        }
        async fn delete(&self, _keys: &[String]) -> Result<(), CacheError> {
            std::future::pending().await
        }
        async fn delete_prefix(&self, _prefix: &str) -> Result<usize, CacheError> {
            std::future::pending().await
        }
        fn mode(&self) -> &'static str {
            "hanging"
        }
    }

    #[tokio::test]
    async fn test_unreachable_store_falls_back_to_loader() {
        let cache = coordinator(Arc::new(DownStore));
        let value: Vec<u8> = cache
            .get_or_load("cache:/x", || async { Ok::<_, ()>(vec![42]) })
            .await
            .unwrap();
        assert_eq!(value, vec![42]);

        cache
            .invalidate(&InvalidationSet::new().key("recipe:1").list("/recipes"))
            .await;
        // read + write + delete + delete_prefix
        assert_eq!(cache.stats().errors, 4);
    }

    #[tokio::test]
    async fn test_slow_store_times_out_into_loader() {
        let cache = CacheCoordinator::new(
            Arc::new(HangingStore),
            DEFAULT_TTL,
            Duration::from_millis(20),
        );
        let value: Vec<u8> = cache
            .get_or_load("cache:/x", || async { Ok::<_, ()>(vec![1]) })
            .await
            .unwrap();
        assert_eq!(value, vec![1]);
        cache.invalidate(&InvalidationSet::new().key("recipe:1")).await;
    }
}
