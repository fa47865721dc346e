//! # recipebox-auth
//!
//! Decides, per request, who is calling and whether they may act.
//!
//! - [`identity`]: verifies a bearer credential into a [`Principal`]
//! - [`policy`]: the role hierarchy and the capability table
//! - [`membership`]: group-membership and ownership checks
//! - [`middleware`]: axum extractor and error responses

pub mod config;
pub mod error;
pub mod identity;
pub mod membership;
pub mod middleware;
pub mod policy;
pub mod token;

pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, AuthResult, ErrorCategory};
pub use identity::{IdentityVerifier, JwtIdentityVerifier, Principal};
pub use membership::{AccessMode, AccessTarget, MembershipResolver};
pub use policy::{Capability, Decision, DenyCode, DenyReason, Requirement, Role, RolePolicy};
