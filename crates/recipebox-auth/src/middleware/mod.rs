//! Axum integration: bearer extraction and error rendering.

pub mod auth;
pub mod error;

pub use auth::{AuthState, BearerAuth};
pub use error::{error_response, status_for};
