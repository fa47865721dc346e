//! HTTP rendering of auth errors.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let message = match &self {
            Self::Configuration { .. } | Self::Internal { .. } => "internal error".to_string(),
            Self::Forbidden(reason) => reason.message.clone(),
            other => other.to_string(),
        };
        error_response(status, self.code(), &message)
    }
}

/// HTTP status for an auth error.
#[must_use]
pub fn status_for(error: &AuthError) -> StatusCode {
    match error {
        AuthError::Unauthenticated { .. }
        | AuthError::Expired
        | AuthError::MalformedIdentity { .. } => StatusCode::UNAUTHORIZED,
        AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
        AuthError::Configuration { .. } | AuthError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Standard error body `{"error": code, "message": text}`.
///
/// 401 responses carry a `WWW-Authenticate: Bearer` challenge.
pub fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let mut headers = HeaderMap::new();
    if status == StatusCode::UNAUTHORIZED {
        let challenge = format!(
            "Bearer realm=\"recipebox\", error=\"{}\", error_description=\"{}\"",
            code,
            message.replace('"', "\\\"")
        );
        if let Ok(value) = HeaderValue::from_str(&challenge) {
            headers.insert(header::WWW_AUTHENTICATE, value);
        }
    }
    (
        status,
        headers,
        Json(json!({ "error": code, "message": message })),
    )
        .into_response()
}
