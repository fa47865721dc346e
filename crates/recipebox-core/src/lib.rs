pub mod error;
pub mod id;
pub mod model;
pub mod page;

pub use error::{CoreError, Result};
pub use id::{GroupId, RecipeId, UserId};
pub use model::{Group, Membership, Recipe, RecipeDraft, RecipePatch, Visibility};
pub use page::Page;
