//! Traits every system-of-record backend implements.

use async_trait::async_trait;
use recipebox_core::{Group, GroupId, Membership, Page, Recipe, RecipeId, UserId};

use crate::error::StorageResult;
use crate::types::{Lookup, RecipeFilter};

/// Read access plus the entry point for transactional writes.
///
/// Reads outside a transaction never observe a transaction that has not
/// committed yet.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_group(&self, id: GroupId) -> StorageResult<Lookup<Group>>;

    async fn get_recipe(&self, id: RecipeId) -> StorageResult<Lookup<Recipe>>;

    async fn is_member(&self, user: UserId, group: GroupId) -> StorageResult<bool>;

    /// Memberships of a group ordered by join time.
    async fn list_members(&self, group: GroupId) -> StorageResult<Vec<Membership>>;

    /// Groups the user belongs to, ordered by creation time.
    async fn list_groups_for_user(&self, user: UserId, page: Page) -> StorageResult<Vec<Group>>;

    /// Ids of every group the user belongs to.
    async fn group_ids_for_user(&self, user: UserId) -> StorageResult<Vec<GroupId>>;

    /// Recipes matching `filter`, ordered by creation time then id.
    async fn list_recipes(&self, filter: &RecipeFilter, page: Page) -> StorageResult<Vec<Recipe>>;

    /// Starts a transaction. Writes are only possible through it.
    async fn begin(&self) -> StorageResult<Box<dyn RecordTransaction>>;

    /// Short name of the backend for logs.
    fn backend_name(&self) -> &'static str;
}

/// A unit of work against the system of record.
///
/// Nothing written through a transaction is visible to other callers until
/// [`commit`](RecordTransaction::commit) returns. Dropping a transaction
/// without committing discards its writes.
///
/// ```ignore
/// let mut tx = store.begin().await?;
/// tx.insert_group(&group).await?;
/// tx.insert_membership(&Membership::new(group.owner_id, group.id)).await?;
/// tx.commit().await?;
/// ```
#[async_trait]
pub trait RecordTransaction: Send + Sync {
    /// Commits all writes. The transaction is consumed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConnectionError` if the backend cannot be reached.
    async fn commit(self: Box<Self>) -> StorageResult<()>;

    /// Discards all writes. The transaction is consumed.
    async fn rollback(self: Box<Self>) -> StorageResult<()>;

    /// Reads see writes made earlier in this transaction.
    async fn get_group(&self, id: GroupId) -> StorageResult<Lookup<Group>>;

    async fn get_recipe(&self, id: RecipeId) -> StorageResult<Lookup<Recipe>>;

    /// # Errors
    ///
    /// `StorageError::AlreadyExists` if a group with the same id exists.
    async fn insert_group(&mut self, group: &Group) -> StorageResult<()>;

    async fn delete_group(&mut self, id: GroupId) -> StorageResult<Lookup<Group>>;

    /// # Errors
    ///
    /// `StorageError::AlreadyExists` if the pair is already a membership,
    /// `StorageError::NotFound` if the group does not exist.
    async fn insert_membership(&mut self, membership: &Membership) -> StorageResult<()>;

    /// Returns `false` when there was no such membership.
    async fn delete_membership(&mut self, user: UserId, group: GroupId) -> StorageResult<bool>;

    /// Deletes every membership of a group and returns them.
    async fn delete_memberships_for_group(
        &mut self,
        group: GroupId,
    ) -> StorageResult<Vec<Membership>>;

    /// # Errors
    ///
    /// `StorageError::NotFound` if the recipe's group does not exist.
    async fn insert_recipe(&mut self, recipe: &Recipe) -> StorageResult<()>;

    /// Replaces a stored recipe. `NotFound` when it does not exist.
    async fn update_recipe(&mut self, recipe: &Recipe) -> StorageResult<Lookup<Recipe>>;

    async fn delete_recipe(&mut self, id: RecipeId) -> StorageResult<Lookup<Recipe>>;

    /// Deletes every recipe of a group and returns them.
    async fn delete_recipes_for_group(&mut self, group: GroupId) -> StorageResult<Vec<Recipe>>;
}
