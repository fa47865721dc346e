use super::engine::Requirement;
use super::role::{Role, RoleSet};

/// Roles that may bypass group membership.
pub const STAFF: RoleSet = RoleSet::of(&[Role::Admin, Role::SuperAdmin]);

/// Roles that may manage group membership.
pub const ELEVATED: RoleSet = RoleSet::of(&[Role::Creator, Role::Admin, Role::SuperAdmin]);

/// Every gated action, each with exactly one requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    BrowseRecipes,
    /// See recipes of one's own groups in the general listing. Without it
    /// only public recipes are listed.
    BrowseGroupRecipes,
    ViewGroups,
    CreateGroup,
    /// Create, edit or delete recipes inside a group the caller belongs to.
    WriteRecipes,
    ManageMembers,
    BypassMembership,
    PublishRecipe,
}

impl Capability {
    pub const fn requirement(&self) -> Requirement {
        match self {
            Self::BrowseRecipes | Self::ViewGroups => Requirement::at_least(Role::Guest),
            Self::BrowseGroupRecipes | Self::CreateGroup | Self::WriteRecipes => {
                Requirement::at_least(Role::Member)
            }
            Self::ManageMembers => Requirement::any_of(ELEVATED),
            Self::BypassMembership => Requirement::at_least(Role::Admin),
            Self::PublishRecipe => {
                Requirement::any_of(STAFF.with(Role::Premium)).with_active_subscription()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Principal;
    use crate::policy::RolePolicy;
    use recipebox_core::UserId;

    fn allowed(role: Role, capability: Capability) -> bool {
        RolePolicy::new()
            .check(&Principal::new(UserId::new(), role), capability)
            .is_allowed()
    }

    #[test]
    fn test_capability_table() {
        assert!(allowed(Role::Guest, Capability::BrowseRecipes));
        assert!(allowed(Role::Guest, Capability::ViewGroups));
        assert!(!allowed(Role::Guest, Capability::BrowseGroupRecipes));
        assert!(allowed(Role::Member, Capability::BrowseGroupRecipes));
        assert!(!allowed(Role::Guest, Capability::CreateGroup));
        assert!(!allowed(Role::Guest, Capability::WriteRecipes));
        assert!(allowed(Role::Member, Capability::WriteRecipes));

        assert!(!allowed(Role::Member, Capability::ManageMembers));
        assert!(allowed(Role::Creator, Capability::ManageMembers));
        assert!(!allowed(Role::Premium, Capability::ManageMembers));

        assert!(!allowed(Role::Premium, Capability::BypassMembership));
        assert!(allowed(Role::Admin, Capability::BypassMembership));

        assert!(allowed(Role::Premium, Capability::PublishRecipe));
        assert!(!allowed(Role::Creator, Capability::PublishRecipe));
        assert!(allowed(Role::SuperAdmin, Capability::PublishRecipe));
    }
}
