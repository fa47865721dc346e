//! The role hierarchy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Privilege tier carried by every principal.
///
/// Declaration order is the rank order: `Guest < Member < Creator < Premium <
/// Admin < SuperAdmin`. Do not reorder the variants.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    #[default]
    Member,
    Creator,
    Premium,
    Admin,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Guest,
        Role::Member,
        Role::Creator,
        Role::Premium,
        Role::Admin,
        Role::SuperAdmin,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Member => "member",
            Self::Creator => "creator",
            Self::Premium => "premium",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Position in the hierarchy, `0` for `Guest`.
    pub const fn rank(&self) -> u8 {
        *self as u8
    }

    /// `true` when `self` ranks at or above `threshold`.
    pub const fn at_least(&self, threshold: Role) -> bool {
        self.rank() >= threshold.rank()
    }

    /// Role named by a token claim. Absent or unknown values fall back to
    /// [`Role::Member`].
    pub fn from_claim(claim: Option<&str>) -> Role {
        match claim {
            Some(value) => value.parse().unwrap_or_else(|_| {
                tracing::debug!(role = %value, "unknown role claim, using member");
                Role::Member
            }),
            None => Role::Member,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// A fixed set of roles, for requirements that are not a simple threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const EMPTY: RoleSet = RoleSet(0);

    pub const fn of(roles: &[Role]) -> RoleSet {
        let mut bits = 0u8;
        let mut i = 0;
        while i < roles.len() {
            bits |= 1 << roles[i].rank();
            i += 1;
        }
        RoleSet(bits)
    }

    pub const fn contains(&self, role: Role) -> bool {
        self.0 & (1 << role.rank()) != 0
    }

    pub const fn with(self, role: Role) -> RoleSet {
        RoleSet(self.0 | (1 << role.rank()))
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(|role| self.contains(*role))
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|r| r.as_str()).collect();
        write!(f, "{}", names.join(", "))
    }
}
