//! Group-membership checks, independent of role rank.

use std::sync::Arc;
use std::time::Duration;

use recipebox_core::{Group, GroupId, Recipe, UserId, Visibility};
use recipebox_storage::{RecordStore, StorageError};

use crate::error::{AuthError, AuthResult};
use crate::identity::Principal;
use crate::policy::{Capability, DenyCode, DenyReason, RolePolicy};

/// Something reachable through a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessTarget {
    Group(GroupId),
    Recipe {
        group_id: GroupId,
        visibility: Visibility,
    },
}

impl AccessTarget {
    pub fn group_id(&self) -> GroupId {
        match self {
            Self::Group(id) => *id,
            Self::Recipe { group_id, .. } => *group_id,
        }
    }

    fn is_public(&self) -> bool {
        matches!(
            self,
            Self::Recipe {
                visibility: Visibility::Public,
                ..
            }
        )
    }
}

impl From<&Group> for AccessTarget {
    fn from(group: &Group) -> Self {
        Self::Group(group.id)
    }
}

impl From<&Recipe> for AccessTarget {
    fn from(recipe: &Recipe) -> Self {
        Self::Recipe {
            group_id: recipe.group_id,
            visibility: recipe.visibility,
        }
    }
}

/// Read access honours public visibility; write access never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

/// Answers "may this principal reach this resource" from membership and
/// ownership.
///
/// Staff roles (`Admin`, `SuperAdmin`) bypass membership entirely.
#[derive(Clone)]
pub struct MembershipResolver {
    store: Arc<dyn RecordStore>,
    timeout: Duration,
}

impl MembershipResolver {
    pub fn new(store: Arc<dyn RecordStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// `Creator`, `Admin` and `SuperAdmin` may manage memberships.
    pub fn is_elevated(principal: &Principal) -> bool {
        RolePolicy::new()
            .authorize(principal, &Capability::ManageMembers.requirement())
            .is_allowed()
    }

    pub fn bypasses_membership(principal: &Principal) -> bool {
        RolePolicy::new()
            .authorize(principal, &Capability::BypassMembership.requirement())
            .is_allowed()
    }

    /// Gate for membership-management actions.
    pub fn require_elevated(&self, principal: &Principal) -> bool {
        Self::is_elevated(principal)
    }

    pub async fn is_member(&self, user: UserId, group: GroupId) -> AuthResult<bool> {
        match tokio::time::timeout(self.timeout, self.store.is_member(user, group)).await {
            Ok(result) => result.map_err(storage_failure),
            Err(_) => {
                tracing::error!(user_id = %user, group_id = %group, "membership lookup timed out");
                Err(AuthError::internal("membership lookup timed out"))
            }
        }
    }

    /// Public resources, members of the owning group and staff.
    pub async fn can_access(&self, principal: &Principal, target: AccessTarget) -> AuthResult<bool> {
        self.can(principal, target, AccessMode::Read).await
    }

    pub async fn can(
        &self,
        principal: &Principal,
        target: AccessTarget,
        mode: AccessMode,
    ) -> AuthResult<bool> {
        if mode == AccessMode::Read && target.is_public() {
            return Ok(true);
        }
        if Self::bypasses_membership(principal) {
            return Ok(true);
        }
        self.is_member(principal.id, target.group_id()).await
    }

    /// Like [`can`](Self::can) but turns a `false` into `Forbidden`.
    pub async fn require(
        &self,
        principal: &Principal,
        target: AccessTarget,
        mode: AccessMode,
    ) -> AuthResult<()> {
        if self.can(principal, target, mode).await? {
            return Ok(());
        }
        tracing::debug!(
            user_id = %principal.id,
            group_id = %target.group_id(),
            ?mode,
            "membership check denied"
        );
        Err(DenyReason::new(DenyCode::NotAMember, "not a member of this group").into())
    }

    /// Owner of the group, or an elevated role.
    pub fn require_owner_or_elevated(&self, principal: &Principal, group: &Group) -> AuthResult<()> {
        if group.is_owned_by(principal.id) || Self::is_elevated(principal) {
            return Ok(());
        }
        Err(DenyReason::new(
            DenyCode::NotOwner,
            "only the group owner or an elevated role may do this",
        )
        .into())
    }
}

fn storage_failure(err: StorageError) -> AuthError {
    tracing::error!(error = %err, category = %err.category(), "membership lookup failed");
    AuthError::internal("membership lookup failed")
}
