//! Authentication configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for verifying bearer tokens.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// jwt_secret = "change-me"
/// audience = "authenticated"
/// leeway = "5s"
/// verify_timeout = "1s"
/// ```
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HS256 secret.
    pub jwt_secret: String,

    /// Expected `aud` claim.
    pub audience: String,

    /// Clock skew tolerated on `exp`.
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,

    /// Upper bound on one credential verification.
    #[serde(with = "humantime_serde")]
    pub verify_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            audience: "authenticated".to_string(),
            leeway: Duration::ZERO,
            verify_timeout: Duration::from_secs(1),
        }
    }
}

// The secret must never end up in logs.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("audience", &self.audience)
            .field("leeway", &self.leeway)
            .field("verify_timeout", &self.verify_timeout)
            .finish()
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the secret or audience is empty and
    /// `ConfigError::InvalidValue` if the verification timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::Missing("auth.jwt_secret".to_string()));
        }
        if self.audience.is_empty() {
            return Err(ConfigError::Missing("auth.audience".to_string()));
        }
        if self.verify_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "auth.verify_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
