use std::sync::Arc;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use recipebox_core::{Group, GroupId, Membership, Recipe, RecipeId, UserId};
use recipebox_storage::{Lookup, RecordTransaction, StorageError, StorageResult};
use tokio::sync::OwnedRwLockWriteGuard;

use crate::storage::TransactionCounters;
use crate::tables::Tables;

/// Snapshot transaction over [`InMemoryStore`](crate::InMemoryStore).
///
/// Holds the store's write lock until it is committed, rolled back or
/// dropped. Writes go to `staged`; commit replaces the live tables with it.
pub struct InMemoryTransaction {
    guard: OwnedRwLockWriteGuard<Tables>,
    staged: Tables,
    counters: Arc<TransactionCounters>,
}

impl InMemoryTransaction {
    /// Rows that reference a group may only be written while it exists.
    fn require_group(&self, id: GroupId) -> StorageResult<()> {
        if self.staged.groups.contains_key(&id) {
            Ok(())
        } else {
            Err(StorageError::not_found("group", id))
        }
    }

    pub(crate) fn new(guard: OwnedRwLockWriteGuard<Tables>, counters: Arc<TransactionCounters>) -> Self {
        let staged = guard.clone();
        Self {
            guard,
            staged,
            counters,
        }
    }
}

#[async_trait]
impl RecordTransaction for InMemoryTransaction {
    async fn commit(self: Box<Self>) -> StorageResult<()> {
        let Self {
            mut guard,
            staged,
            counters,
        } = *self;
        *guard = staged;
        counters.committed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        self.counters.rolled_back.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("in-memory transaction rolled back");
        Ok(())
    }

    async fn get_group(&self, id: GroupId) -> StorageResult<Lookup<Group>> {
        Ok(self.staged.groups.get(&id).cloned().into())
    }

    async fn get_recipe(&self, id: RecipeId) -> StorageResult<Lookup<Recipe>> {
        Ok(self.staged.recipes.get(&id).cloned().into())
    }

    async fn insert_group(&mut self, group: &Group) -> StorageResult<()> {
        if self.staged.groups.contains_key(&group.id) {
            return Err(StorageError::already_exists("group", group.id));
        }
        self.staged.groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn delete_group(&mut self, id: GroupId) -> StorageResult<Lookup<Group>> {
        Ok(self.staged.groups.remove(&id).into())
    }

    async fn insert_membership(&mut self, membership: &Membership) -> StorageResult<()> {
        self.require_group(membership.group_id)?;
        let key = (membership.group_id, membership.user_id);
        if self.staged.memberships.contains_key(&key) {
            return Err(StorageError::already_exists(
                "membership",
                format!("{}:{}", membership.group_id, membership.user_id),
            ));
        }
        self.staged.memberships.insert(key, membership.clone());
        Ok(())
    }

    async fn delete_membership(&mut self, user: UserId, group: GroupId) -> StorageResult<bool> {
        Ok(self.staged.memberships.remove(&(group, user)).is_some())
    }

    async fn delete_memberships_for_group(
        &mut self,
        group: GroupId,
    ) -> StorageResult<Vec<Membership>> {
        let removed = self.staged.members_of(group);
        self.staged.memberships.retain(|(g, _), _| *g != group);
        Ok(removed)
    }

    async fn insert_recipe(&mut self, recipe: &Recipe) -> StorageResult<()> {
        self.require_group(recipe.group_id)?;
        if self.staged.recipes.contains_key(&recipe.id) {
            return Err(StorageError::already_exists("recipe", recipe.id));
        }
        self.staged.recipes.insert(recipe.id, recipe.clone());
        Ok(())
    }

    async fn update_recipe(&mut self, recipe: &Recipe) -> StorageResult<Lookup<Recipe>> {
        match self.staged.recipes.get_mut(&recipe.id) {
            Some(stored) => {
                *stored = recipe.clone();
                Ok(Lookup::Found(recipe.clone()))
            }
            None => Ok(Lookup::NotFound),
        }
    }

    async fn delete_recipe(&mut self, id: RecipeId) -> StorageResult<Lookup<Recipe>> {
        Ok(self.staged.recipes.remove(&id).into())
    }

    async fn delete_recipes_for_group(&mut self, group: GroupId) -> StorageResult<Vec<Recipe>> {
        let ids: Vec<RecipeId> = self
            .staged
            .recipes
            .values()
            .filter(|r| r.group_id == group)
            .map(|r| r.id)
            .collect();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.staged.recipes.remove(&id))
            .collect())
    }
}
