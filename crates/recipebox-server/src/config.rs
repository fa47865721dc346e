use std::net::SocketAddr;
use std::time::Duration;

use recipebox_auth::AuthConfig;
use serde::{Deserialize, Serialize};

/// Process configuration, built once in `main` and passed down.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config load error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Auth(#[from] recipebox_auth::ConfigError),
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be > 0".into()));
        }
        self.auth.validate()?;
        if self.cache.default_ttl.is_zero() {
            return Err(ConfigError::Invalid("cache.default_ttl must be > 0".into()));
        }
        if self.cache.operation_timeout.is_zero() || self.cache.storage_timeout.is_zero() {
            return Err(ConfigError::Invalid("cache timeouts must be > 0".into()));
        }
        if self.cache.cleanup_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "cache.cleanup_interval must be > 0".into(),
            ));
        }
        if self.rate_limit.enabled
            && (self.rate_limit.requests_per_window == 0 || self.rate_limit.window.is_zero())
        {
            return Err(ConfigError::Invalid(
                "rate_limit.requests_per_window and rate_limit.window must be > 0".into(),
            ));
        }
        if self.redis.enabled && self.redis.url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "redis.enabled=true requires redis.url".into(),
            ));
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        self.server.addr()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        let ip: std::net::IpAddr = self
            .host
            .parse()
            .unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
        SocketAddr::new(ip, self.port)
    }
}

/// Cache and system-of-record timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL of entries written on a miss.
    #[serde(default = "default_ttl", with = "humantime_serde")]
    pub default_ttl: Duration,
    /// Bound on every cache call. Exceeding it counts as a cache failure.
    #[serde(default = "default_operation_timeout", with = "humantime_serde")]
    pub operation_timeout: Duration,
    /// Bound on every system-of-record call. Exceeding it fails the request.
    #[serde(default = "default_storage_timeout", with = "humantime_serde")]
    pub storage_timeout: Duration,
    /// How often expired local entries are swept.
    #[serde(default = "default_cleanup_interval", with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

fn default_ttl() -> Duration {
    crate::cache::DEFAULT_TTL
}
fn default_operation_timeout() -> Duration {
    Duration::from_secs(2)
}
fn default_storage_timeout() -> Duration {
    Duration::from_secs(10)
}
fn default_cleanup_interval() -> Duration {
    Duration::from_secs(60)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            operation_timeout: default_operation_timeout(),
            storage_timeout: default_storage_timeout(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

/// Redis configuration for multi-instance deployments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Default: false (single-instance, local cache)
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_redis_url")]
    pub url: String,

    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}
fn default_redis_pool_size() -> usize {
    16
}
fn default_redis_timeout_ms() -> u64 {
    2000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Request budget per client.
///
/// A client is the bearer credential when one is sent, otherwise the peer
/// address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: u32,
    #[serde(default = "default_rate_window", with = "humantime_serde")]
    pub window: Duration,
}

fn default_rate_limit_enabled() -> bool {
    true
}
fn default_requests_per_window() -> u32 {
    120
}
fn default_rate_window() -> Duration {
    Duration::from_secs(60)
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            requests_per_window: default_requests_per_window(),
            window: default_rate_window(),
        }
    }
}

pub mod loader {
    use super::{AppConfig, ConfigError};
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    pub const DEFAULT_PATH: &str = "recipebox.toml";
    pub const ENV_PREFIX: &str = "RECIPEBOX";

    /// Layer an optional TOML file under `RECIPEBOX__SECTION__FIELD`
    /// environment variables, then validate.
    pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let mut builder = Config::builder();
        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PATH));
        if file.exists() {
            builder = builder.add_source(File::from(file));
        } else if path.is_some() {
            return Err(ConfigError::Invalid(format!(
                "config file {} does not exist",
                file.display()
            )));
        }
        // e.g. RECIPEBOX__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );
        let merged: AppConfig = builder.build()?.try_deserialize()?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "secret".into();
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.cache.default_ttl, Duration::from_secs(300));
        assert!(!config.redis.enabled);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());
        assert!(matches!(
            AppConfig::default().validate(),
            Err(ConfigError::Auth(_))
        ));

        let mut config = valid();
        config.cache.default_ttl = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.rate_limit.requests_per_window = 0;
        assert!(config.validate().is_err());
        config.rate_limit.enabled = false;
        assert!(config.validate().is_ok());

        let mut config = valid();
        config.logging.level = "loud".into();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.redis.enabled = true;
        config.redis.url = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9191

[auth]
jwt_secret = "from-file"
audience = "authenticated"

[cache]
default_ttl = "60s"

[rate_limit]
requests_per_window = 30
window = "10s"
"#
        )
        .unwrap();

        let config = loader::load_config(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9191);
        assert_eq!(config.auth.jwt_secret, "from-file");
        assert_eq!(config.cache.default_ttl, Duration::from_secs(60));
        assert_eq!(config.cache.storage_timeout, Duration::from_secs(10));
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.requests_per_window, 30);
        assert_eq!(config.rate_limit.window, Duration::from_secs(10));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = loader::load_config(Some(std::path::Path::new("/nonexistent/recipebox.toml")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_addr() {
        let mut config = valid();
        config.server.host = "127.0.0.1".into();
        config.server.port = 8080;
        assert_eq!(config.addr().to_string(), "127.0.0.1:8080");
    }
}
