//! Authentication and authorization error types.

use std::fmt;

use crate::policy::DenyReason;

/// Errors raised while establishing who is calling and what they may do.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The credential is missing, malformed, wrongly signed or meant for
    /// another audience.
    #[error("Unauthenticated: {message}")]
    Unauthenticated {
        /// Description of why the credential was rejected.
        message: String,
    },

    /// The credential was valid once but its `exp` has passed.
    #[error("Token expired")]
    Expired,

    /// The credential verified but its subject is missing or unparseable.
    #[error("Malformed identity: {message}")]
    MalformedIdentity {
        /// Description of what is wrong with the subject.
        message: String,
    },

    /// The principal may not perform the action.
    #[error("Forbidden: {0}")]
    Forbidden(DenyReason),

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected failure, including a lookup that timed out.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `Unauthenticated` error.
    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// Creates a new `MalformedIdentity` error.
    #[must_use]
    pub fn malformed_identity(message: impl Into<String>) -> Self {
        Self::MalformedIdentity {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` for errors that mean "who are you?" (HTTP 401).
    #[must_use]
    pub fn is_identity_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated { .. } | Self::Expired | Self::MalformedIdentity { .. }
        )
    }

    /// Returns `true` if this is a forbidden error.
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    /// Stable machine-readable code, also used as the `error` field of
    /// HTTP error bodies.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated { .. } => "unauthenticated",
            Self::Expired => "expired",
            Self::MalformedIdentity { .. } => "malformed_identity",
            Self::Forbidden(_) => "forbidden",
            Self::Configuration { .. } | Self::Internal { .. } => "internal",
        }
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthenticated { .. } | Self::Expired | Self::MalformedIdentity { .. } => {
                ErrorCategory::Authentication
            }
            Self::Forbidden(_) => ErrorCategory::Authorization,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

impl From<DenyReason> for AuthError {
    fn from(reason: DenyReason) -> Self {
        Self::Forbidden(reason)
    }
}

/// Categories of auth errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Authentication,
    Authorization,
    Configuration,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Convenience result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
