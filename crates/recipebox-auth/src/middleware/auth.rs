//! Bearer token extractor.
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use recipebox_auth::middleware::{AuthState, BearerAuth};
//!
//! async fn me(BearerAuth(principal): BearerAuth) -> String {
//!     principal.id.to_string()
//! }
//!
//! let app = Router::new()
//!     .route("/users/me", get(me))
//!     .with_state(auth_state);
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AuthError;
use crate::identity::{IdentityVerifier, Principal};

/// State required by [`BearerAuth`].
///
/// Include it in the application state and expose it through `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Upper bound on one verification. Exceeding it is an internal error,
    /// never a rejection of the credential.
    pub timeout: Duration,
}

impl AuthState {
    pub fn new(verifier: Arc<dyn IdentityVerifier>, timeout: Duration) -> Self {
        Self { verifier, timeout }
    }
}

/// Extracts and verifies `Authorization: Bearer <token>`.
///
/// # Errors
///
/// Rejects with `AuthError` (which implements `IntoResponse`) when the
/// header is missing or the token does not verify.
pub struct BearerAuth(pub Principal);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let token = bearer_token(parts)?;

        match tokio::time::timeout(auth_state.timeout, auth_state.verifier.verify(token)).await {
            Ok(result) => result.map(BearerAuth),
            Err(_) => {
                tracing::error!("credential verification timed out");
                Err(AuthError::internal("credential verification timed out"))
            }
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AuthError::unauthenticated("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AuthError::unauthenticated("Authorization header is not valid ASCII"))?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or_else(|| AuthError::unauthenticated("Authorization scheme must be Bearer"))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::unauthenticated("Empty Bearer token"));
    }
    Ok(token)
}
