//! Errors surfaced by the resource service, and their HTTP rendering.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use recipebox_auth::middleware::error_response;
use recipebox_auth::{AuthError, DenyReason};
use recipebox_core::CoreError;
use recipebox_storage::StorageError;

/// Everything a caller of the service can see. Infrastructure errors are
/// folded into `Internal` before they get here.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Unauthenticated: {message}")]
    Unauthenticated { message: String },

    #[error("Token expired")]
    Expired,

    #[error("Malformed identity: {message}")]
    MalformedIdentity { message: String },

    #[error("Forbidden: {0}")]
    Forbidden(DenyReason),

    #[error("{kind} {id} not found")]
    NotFound { kind: String, id: String },

    /// Duplicate membership.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Too many requests")]
    RateLimited,

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    #[must_use]
    pub fn not_found(kind: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.to_string(),
        }
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Stable machine-readable code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated { .. } => "unauthenticated",
            Self::Expired => "expired",
            Self::MalformedIdentity { .. } => "malformed_identity",
            Self::Forbidden(reason) => reason.code.as_str(),
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Validation { .. } => "validation",
            Self::RateLimited => "rate_limited",
            Self::Internal { .. } => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated { .. } | Self::Expired | Self::MalformedIdentity { .. } => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } | Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated { message } => Self::Unauthenticated { message },
            AuthError::Expired => Self::Expired,
            AuthError::MalformedIdentity { message } => Self::MalformedIdentity { message },
            AuthError::Forbidden(reason) => Self::Forbidden(reason),
            AuthError::Configuration { message } | AuthError::Internal { message } => {
                Self::Internal { message }
            }
        }
    }
}

impl From<DenyReason> for ServiceError {
    fn from(reason: DenyReason) -> Self {
        Self::Forbidden(reason)
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists { kind, id } => {
                Self::conflict(format!("{kind} {id} already exists"))
            }
            StorageError::NotFound { kind, id } => Self::NotFound { kind, id },
            other => {
                tracing::error!(error = %other, category = %other.category(), "storage failure");
                Self::internal(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ServiceError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal { .. } => "internal error".to_string(),
            Self::Forbidden(reason) => reason.message.clone(),
            other => other.to_string(),
        };
        error_response(status, self.code(), &message)
    }
}
