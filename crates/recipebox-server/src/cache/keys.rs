//! Deterministic cache keys.
//!
//! - single entities: `<entity-type>:<entity-id>`, e.g. `recipe:6f1c...`
//! - list queries: `cache:<path>` or `cache:<path>:<query>`
//!
//! A list whose content depends on who asks carries a viewer scope as the
//! first query parameter (`viewer=<uuid>`, `scope=public`, `scope=all`), so
//! one principal's list is never served to another and one viewer's lists
//! can be dropped by prefix.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use recipebox_core::{GroupId, Page, RecipeId, UserId};

pub const LIST_PREFIX: &str = "cache";

/// Key for one entity.
pub fn entity_key(entity_type: &str, id: impl fmt::Display) -> String {
    format!("{entity_type}:{id}")
}

pub fn group_key(id: GroupId) -> String {
    entity_key(GroupId::kind(), id)
}

pub fn recipe_key(id: RecipeId) -> String {
    entity_key(RecipeId::kind(), id)
}

/// Who a list was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerScope {
    /// Lists that differ per user.
    User(UserId),
    /// Only public entries, the same for every caller.
    Public,
    /// Everything, the same for every caller allowed to see it.
    All,
}

impl fmt::Display for ViewerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "viewer={id}"),
            Self::Public => f.write_str("scope=public"),
            Self::All => f.write_str("scope=all"),
        }
    }
}

/// Collection paths with cached list results.
pub mod paths {
    use recipebox_core::GroupId;

    pub const MY_GROUPS: &str = "/groups";
    pub const RECIPES: &str = "/recipes";

    pub fn group_members(group: GroupId) -> String {
        format!("/groups/{group}/members")
    }

    pub fn group_recipes(group: GroupId) -> String {
        format!("/groups/{group}/recipes")
    }
}

/// Signature of a list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    path: String,
    scope: Option<ViewerScope>,
    params: BTreeMap<String, String>,
}

impl ListQuery {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            scope: None,
            params: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn scoped(mut self, scope: ViewerScope) -> Self {
        self.scope = Some(scope);
        self
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    #[must_use]
    pub fn page(self, page: Page) -> Self {
        self.param("limit", page.limit).param("skip", page.skip)
    }

    /// `scope&k1=v1&k2=v2` with parameters in name order, or `None` when
    /// there is nothing to encode.
    fn query_string(&self) -> Option<String> {
        let mut parts: Vec<String> = Vec::with_capacity(self.params.len() + 1);
        if let Some(scope) = &self.scope {
            parts.push(scope.to_string());
        }
        parts.extend(self.params.iter().map(|(k, v)| format!("{k}={v}")));
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("&"))
        }
    }

    pub fn key(&self) -> String {
        match self.query_string() {
            Some(query) => format!("{LIST_PREFIX}:{}:{query}", self.path),
            None => format!("{LIST_PREFIX}:{}", self.path),
        }
    }
}

/// Keys to drop after a write commits.
///
/// Holds exact keys plus list scopes. A list scope covers the bare list key
/// and every key extending it with more query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationSet {
    keys: BTreeSet<String>,
    lists: BTreeSet<String>,
    scoped_lists: BTreeSet<String>,
}

impl InvalidationSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.keys.insert(key.into());
        self
    }

    /// Every cached variant of the list at `path`, for every viewer.
    #[must_use]
    pub fn list(mut self, path: impl AsRef<str>) -> Self {
        self.lists.insert(format!("{LIST_PREFIX}:{}", path.as_ref()));
        self
    }

    /// Cached variants of the list at `path` computed for `scope` only.
    #[must_use]
    pub fn list_for(mut self, path: impl AsRef<str>, scope: ViewerScope) -> Self {
        self.scoped_lists
            .insert(format!("{LIST_PREFIX}:{}:{scope}", path.as_ref()));
        self
    }

    pub fn extend(&mut self, other: InvalidationSet) {
        self.keys.extend(other.keys);
        self.lists.extend(other.lists);
        self.scoped_lists.extend(other.scoped_lists);
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.lists.is_empty() && self.scoped_lists.is_empty()
    }

    /// Keys to delete exactly: the entity keys and the bare list keys.
    pub fn exact_keys(&self) -> Vec<String> {
        self.keys
            .iter()
            .chain(self.lists.iter())
            .chain(self.scoped_lists.iter())
            .cloned()
            .collect()
    }

    /// Prefixes whose extensions must be deleted. A bare path is extended
    /// with `:`, a scoped one with `&`.
    pub fn prefixes(&self) -> Vec<String> {
        self.lists
            .iter()
            .map(|p| format!("{p}:"))
            .chain(self.scoped_lists.iter().map(|p| format!("{p}&")))
            .collect()
    }

    /// `true` if `key` would be removed by this set.
    pub fn covers(&self, key: &str) -> bool {
        self.exact_keys().iter().any(|k| k == key)
            || self.prefixes().iter().any(|p| key.starts_with(p.as_str()))
    }
}
