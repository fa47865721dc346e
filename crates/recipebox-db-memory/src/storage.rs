use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use recipebox_core::{Group, GroupId, Membership, Page, Recipe, RecipeId, UserId};
use recipebox_storage::{
    Lookup, RecipeFilter, RecordStore, RecordTransaction, StorageResult,
};
use tokio::sync::RwLock;

use crate::tables::Tables;
use crate::transaction::InMemoryTransaction;

/// In-memory system of record.
///
/// All tables sit behind one `RwLock`. A transaction holds the write half for
/// its whole lifetime and works on a private copy of the tables, so readers
/// either see the state before it or the state after its commit.
///
/// Cloning is cheap and shares the data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    pub(crate) tables: Arc<RwLock<Tables>>,
    pub(crate) stats: Arc<TransactionCounters>,
}

/// Transaction counters, mostly useful to assert that a request never
/// reached the store.
#[derive(Debug, Default)]
pub struct TransactionCounters {
    pub(crate) begun: AtomicU64,
    pub(crate) committed: AtomicU64,
    pub(crate) rolled_back: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionStats {
    pub begun: u64,
    pub committed: u64,
    pub rolled_back: u64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> TransactionStats {
        TransactionStats {
            begun: self.stats.begun.load(Ordering::Relaxed),
            committed: self.stats.committed.load(Ordering::Relaxed),
            rolled_back: self.stats.rolled_back.load(Ordering::Relaxed),
        }
    }

    /// Number of stored recipes, regardless of visibility.
    pub async fn recipe_count(&self) -> usize {
        self.tables.read().await.recipes.len()
    }

    pub async fn group_count(&self) -> usize {
        self.tables.read().await.groups.len()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn get_group(&self, id: GroupId) -> StorageResult<Lookup<Group>> {
        Ok(self.tables.read().await.groups.get(&id).cloned().into())
    }

    async fn get_recipe(&self, id: RecipeId) -> StorageResult<Lookup<Recipe>> {
        Ok(self.tables.read().await.recipes.get(&id).cloned().into())
    }

    async fn is_member(&self, user: UserId, group: GroupId) -> StorageResult<bool> {
        Ok(self.tables.read().await.is_member(user, group))
    }

    async fn list_members(&self, group: GroupId) -> StorageResult<Vec<Membership>> {
        Ok(self.tables.read().await.members_of(group))
    }

    async fn list_groups_for_user(&self, user: UserId, page: Page) -> StorageResult<Vec<Group>> {
        Ok(self.tables.read().await.groups_for(user, page))
    }

    async fn group_ids_for_user(&self, user: UserId) -> StorageResult<Vec<GroupId>> {
        Ok(self.tables.read().await.group_ids_for(user))
    }

    async fn list_recipes(&self, filter: &RecipeFilter, page: Page) -> StorageResult<Vec<Recipe>> {
        Ok(self.tables.read().await.recipes(filter, page))
    }

    async fn begin(&self) -> StorageResult<Box<dyn RecordTransaction>> {
        let guard = Arc::clone(&self.tables).write_owned().await;
        self.stats.begun.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(InMemoryTransaction::new(
            guard,
            Arc::clone(&self.stats),
        )))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
