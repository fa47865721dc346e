pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod observability;
pub mod rate_limit;
pub mod server;
pub mod service;

pub use cache::{CacheCoordinator, CacheStore, LocalCacheStore, RedisCacheStore};
pub use config::{
    AppConfig, CacheConfig, LoggingConfig, RateLimitConfig, RedisConfig, ServerConfig,
};
pub use error::{ServiceError, ServiceResult};
pub use handlers::AppState;
pub use observability::init_tracing;
pub use rate_limit::RateLimiter;
pub use server::{RecipeboxServer, ServerBuilder, build_router, build_state};
pub use service::ResourceService;
