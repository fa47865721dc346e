//! Role policy.
//!
//! Every endpoint states what it needs as a [`Capability`]; the capability
//! maps to one [`Requirement`] and [`RolePolicy`] evaluates it into a
//! [`Decision`]. Role comparisons do not happen anywhere else.

mod capability;
mod engine;
mod role;

pub use capability::{Capability, ELEVATED, STAFF};
pub use engine::{Decision, DenyCode, DenyReason, Requirement, RolePolicy, RoleRule};
pub use role::{Role, RoleSet, UnknownRole};
