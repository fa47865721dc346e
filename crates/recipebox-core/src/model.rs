//! Domain records owned by the system of record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{CoreError, Result};
use crate::id::{GroupId, RecipeId, UserId};

/// A family group. The owner is always a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub owner_id: UserId,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Group {
    /// Build a new group owned by `owner`. The name is trimmed and must not be empty.
    pub fn new(owner: UserId, name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::invalid_record("group name must not be empty"));
        }
        Ok(Self {
            id: GroupId::new(),
            owner_id: owner,
            name: name.to_string(),
            created_at: OffsetDateTime::now_utc(),
        })
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == user
    }
}

/// Join record granting a user visibility into a group. Unique per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: UserId,
    pub group_id: GroupId,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

impl Membership {
    pub fn new(user_id: UserId, group_id: GroupId) -> Self {
        Self {
            user_id,
            group_id,
            joined_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Access mode of a recipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Readable by members of the owning group.
    #[default]
    Group,
    /// Readable by everyone.
    Public,
}

impl Visibility {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Public => "public",
        }
    }

    pub const fn is_public(&self) -> bool {
        matches!(self, Self::Public)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "group" => Ok(Self::Group),
            "public" => Ok(Self::Public),
            other => Err(CoreError::UnknownVisibility(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub group_id: GroupId,
    pub created_by: UserId,
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: String,
    pub image_url: Option<String>,
    pub visibility: Visibility,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Recipe {
    /// Materialize a submitted draft as a recipe in `group`.
    pub fn from_draft(group_id: GroupId, author: UserId, draft: RecipeDraft) -> Result<Self> {
        draft.validate()?;
        let now = OffsetDateTime::now_utc();
        Ok(Self {
            id: RecipeId::new(),
            group_id,
            created_by: author,
            title: draft.title.trim().to_string(),
            ingredients: draft.ingredients,
            instructions: draft.instructions,
            image_url: draft.image_url,
            visibility: draft.visibility,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: RecipePatch) -> Result<()> {
        if let Some(title) = patch.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(CoreError::invalid_record("recipe title must not be empty"));
            }
            self.title = title.to_string();
        }
        if let Some(ingredients) = patch.ingredients {
            self.ingredients = ingredients;
        }
        if let Some(instructions) = patch.instructions {
            self.instructions = instructions;
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = image_url;
        }
        if let Some(visibility) = patch.visibility {
            self.visibility = visibility;
        }
        self.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }
}

/// Fields submitted when creating a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
}

impl RecipeDraft {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CoreError::invalid_record("recipe title must not be empty"));
        }
        Ok(())
    }
}

/// Partial update of a recipe. `None` leaves the field untouched;
/// `image_url: Some(None)` clears the image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipePatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub ingredients: Option<Vec<String>>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub image_url: Option<Option<String>>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

impl RecipePatch {
    pub fn makes_public(&self) -> bool {
        self.visibility.is_some_and(|v| v.is_public())
    }
}

// A field that is present, even as `null`, is `Some`.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
