//! Role requirements and their evaluation.

use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;

use super::capability::Capability;
use super::role::{Role, RoleSet};
use crate::identity::Principal;

// =============================================================================
// Access Decision
// =============================================================================

/// Result of evaluating a requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }

    #[must_use]
    pub fn deny_reason(&self) -> Option<&DenyReason> {
        match self {
            Self::Deny(reason) => Some(reason),
            Self::Allow => None,
        }
    }

    /// Turn a deny into an error so callers can use `?`.
    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(reason),
        }
    }
}

// =============================================================================
// Deny Reason
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyCode {
    InsufficientRole,
    RoleNotAllowed,
    SubscriptionExpired,
    NotAMember,
    NotOwner,
}

impl DenyCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientRole => "insufficient_role",
            Self::RoleNotAllowed => "role_not_allowed",
            Self::SubscriptionExpired => "subscription_expired",
            Self::NotAMember => "not_a_member",
            Self::NotOwner => "not_owner",
        }
    }
}

/// Why access was denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenyReason {
    pub code: DenyCode,
    pub message: String,
}

impl DenyReason {
    #[must_use]
    pub fn new(code: DenyCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

// =============================================================================
// Requirement
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRule {
    /// The principal's role must rank at or above the threshold.
    AtLeast(Role),
    /// The principal's role must be one of the set.
    AnyOf(RoleSet),
}

/// What a principal needs to hold to perform an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub rule: RoleRule,
    /// When set, a `Premium` principal must also have an unexpired
    /// subscription. Other roles are not subject to the check.
    pub active_subscription: bool,
}

impl Requirement {
    pub const fn at_least(role: Role) -> Self {
        Self {
            rule: RoleRule::AtLeast(role),
            active_subscription: false,
        }
    }

    pub const fn any_of(roles: RoleSet) -> Self {
        Self {
            rule: RoleRule::AnyOf(roles),
            active_subscription: false,
        }
    }

    #[must_use]
    pub const fn with_active_subscription(mut self) -> Self {
        self.active_subscription = true;
        self
    }
}

// =============================================================================
// Role Policy
// =============================================================================

/// Evaluates role requirements. Never fails; a deny is a value.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePolicy;

impl RolePolicy {
    pub const fn new() -> Self {
        Self
    }

    /// `true` when `role` ranks at or above `threshold`.
    pub const fn at_least(role: Role, threshold: Role) -> bool {
        role.at_least(threshold)
    }

    pub fn authorize(&self, principal: &Principal, requirement: &Requirement) -> Decision {
        self.authorize_at(principal, requirement, OffsetDateTime::now_utc())
    }

    /// [`authorize`](Self::authorize) against an explicit clock.
    pub fn authorize_at(
        &self,
        principal: &Principal,
        requirement: &Requirement,
        now: OffsetDateTime,
    ) -> Decision {
        let role = principal.role;
        match requirement.rule {
            RoleRule::AtLeast(threshold) if !Self::at_least(role, threshold) => {
                return Decision::Deny(DenyReason::new(
                    DenyCode::InsufficientRole,
                    format!("requires role {threshold} or higher, principal has {role}"),
                ));
            }
            RoleRule::AnyOf(allowed) if !allowed.contains(role) => {
                return Decision::Deny(DenyReason::new(
                    DenyCode::RoleNotAllowed,
                    format!("requires one of [{allowed}], principal has {role}"),
                ));
            }
            _ => {}
        }

        if requirement.active_subscription
            && role == Role::Premium
            && principal.subscription_expired_at(now)
        {
            return Decision::Deny(DenyReason::new(
                DenyCode::SubscriptionExpired,
                "premium subscription has expired",
            ));
        }

        Decision::Allow
    }

    /// Evaluate the requirement a capability is declared with.
    pub fn check(&self, principal: &Principal, capability: Capability) -> Decision {
        let decision = self.authorize(principal, &capability.requirement());
        if let Decision::Deny(reason) = &decision {
            tracing::debug!(
                user_id = %principal.id,
                role = %principal.role,
                capability = ?capability,
                code = reason.code.as_str(),
                "role check denied"
            );
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipebox_core::UserId;
    use time::Duration;

    fn principal(role: Role) -> Principal {
        Principal::new(UserId::new(), role)
    }

    #[test]
    fn test_threshold() {
        let policy = RolePolicy::new();
        let req = Requirement::at_least(Role::Member);
        assert!(policy.authorize(&principal(Role::Member), &req).is_allowed());
        assert!(policy.authorize(&principal(Role::SuperAdmin), &req).is_allowed());

        let denied = policy.authorize(&principal(Role::Guest), &req);
        assert_eq!(
            denied.deny_reason().map(|r| r.code),
            Some(DenyCode::InsufficientRole)
        );
    }

    #[test]
    fn test_allow_set_is_not_monotonic() {
        let policy = RolePolicy::new();
        let req = Requirement::any_of(RoleSet::of(&[
            Role::Premium,
            Role::Admin,
            Role::SuperAdmin,
        ]));
        assert!(policy.authorize(&principal(Role::Premium), &req).is_allowed());
        assert!(policy.authorize(&principal(Role::Admin), &req).is_allowed());

        let creator = policy.authorize(&principal(Role::Creator), &req);
        assert_eq!(
            creator.deny_reason().map(|r| r.code),
            Some(DenyCode::RoleNotAllowed)
        );
    }

    #[test]
    fn test_expired_premium_is_denied() {
        let policy = RolePolicy::new();
        let now = OffsetDateTime::now_utc();
        let req = Requirement::any_of(RoleSet::of(&[Role::Premium, Role::Admin]))
            .with_active_subscription();

        let expired = principal(Role::Premium).with_subscription_expiry(now - Duration::days(1));
        let decision = policy.authorize_at(&expired, &req, now);
        assert_eq!(
            decision.deny_reason().map(|r| r.code),
            Some(DenyCode::SubscriptionExpired)
        );

        let active = principal(Role::Premium).with_subscription_expiry(now + Duration::days(1));
        assert!(policy.authorize_at(&active, &req, now).is_allowed());

        let open_ended = principal(Role::Premium);
        assert!(policy.authorize_at(&open_ended, &req, now).is_allowed());
    }

    #[test]
    fn test_admin_ignores_subscription_expiry() {
        let policy = RolePolicy::new();
        let now = OffsetDateTime::now_utc();
        let req = Requirement::any_of(RoleSet::of(&[Role::Premium, Role::Admin]))
            .with_active_subscription();
        let admin = principal(Role::Admin).with_subscription_expiry(now - Duration::days(30));
        assert!(policy.authorize_at(&admin, &req, now).is_allowed());
    }

    #[test]
    fn test_static_at_least() {
        assert!(RolePolicy::at_least(Role::Admin, Role::Creator));
        assert!(!RolePolicy::at_least(Role::Creator, Role::Admin));
        assert!(RolePolicy::at_least(Role::Guest, Role::Guest));
    }

    #[test]
    fn test_into_result() {
        assert!(Decision::Allow.into_result().is_ok());
        let reason = DenyReason::new(DenyCode::NotOwner, "x");
        assert_eq!(
            Decision::Deny(reason.clone()).into_result(),
            Err(reason)
        );
    }
}
