//! Read-through cache for groups, recipes and list queries.
//!
//! ```text
//! read:  key → CacheStore ── hit ──→ value
//!                  └─ miss/error → loader (system of record) → store → value
//! write: commit → InvalidationSet → delete keys + list prefixes
//! ```
//!
//! If Redis is unavailable or disabled, the server runs with a local
//! per-instance store.

pub mod coordinator;
pub mod keys;
pub mod redis_store;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

pub use coordinator::{CacheCoordinator, CacheStats, CacheValue, DEFAULT_TTL};
pub use keys::{InvalidationSet, ListQuery, ViewerScope, entity_key, group_key, recipe_key};
pub use redis_store::RedisCacheStore;
pub use store::{CacheError, CacheStore, CachedEntry, LocalCacheStore};

use crate::config::RedisConfig;

/// Create a cache store based on configuration.
///
/// - **Redis disabled**: local store (DashMap)
/// - **Redis enabled**: connects to Redis, falls back to local on failure
pub async fn create_cache_store(config: &RedisConfig) -> Arc<dyn CacheStore> {
    if !config.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return Arc::new(LocalCacheStore::new());
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let timeout = Duration::from_millis(config.timeout_ms);
    let pool_config = redis_config
        .pool
        .get_or_insert_with(|| deadpool_redis::PoolConfig::new(config.pool_size));
    pool_config.max_size = config.pool_size;
    pool_config.timeouts.wait = Some(timeout);
    pool_config.timeouts.create = Some(timeout);
    pool_config.timeouts.recycle = Some(timeout);

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return Arc::new(LocalCacheStore::new());
        }
    };

    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis");
            Arc::new(RedisCacheStore::new(pool))
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to local cache."
            );
            Arc::new(LocalCacheStore::new())
        }
    }
}
