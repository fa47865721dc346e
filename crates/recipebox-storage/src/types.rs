//! Outcome and query types shared by storage backends.

use recipebox_core::GroupId;
use serde::{Deserialize, Serialize};

/// Result of looking up a single record.
///
/// Absence is an ordinary outcome, not an error, so callers match on it
/// rather than inspecting error kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    pub fn as_ref(&self) -> Lookup<&T> {
        match self {
            Self::Found(value) => Lookup::Found(value),
            Self::NotFound => Lookup::NotFound,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(value) => Lookup::Found(f(value)),
            Self::NotFound => Lookup::NotFound,
        }
    }

    /// Convert to a `Result`, producing `err` when nothing was found.
    pub fn ok_or_else<E>(self, err: impl FnOnce() -> E) -> Result<T, E> {
        match self {
            Self::Found(value) => Ok(value),
            Self::NotFound => Err(err()),
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Found(value),
            None => Self::NotFound,
        }
    }
}

/// Which recipes a listing may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeFilter {
    /// Only recipes with public visibility.
    PublicOnly,
    /// Public recipes plus every recipe of the given groups.
    PublicOrGroups(Vec<GroupId>),
    /// Recipes of one group regardless of visibility.
    Group(GroupId),
    /// Everything.
    All,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_conversions() {
        let found: Lookup<u8> = Some(3).into();
        assert!(found.is_found());
        assert_eq!(found.clone().map(|v| v * 2), Lookup::Found(6));
        assert_eq!(found.found(), Some(3));

        let missing: Lookup<u8> = None.into();
        assert_eq!(missing.ok_or_else(|| "gone"), Err("gone"));
    }
}
