//! Resource operations on groups and recipes.
//!
//! Every operation runs the same pipeline:
//!
//! ```text
//! Principal → RolePolicy (capability) → MembershipResolver → transaction → invalidate
//! ```
//!
//! A deny at either gate returns before the system of record is touched. The
//! transaction commits or rolls back as a whole, and cache invalidation runs
//! only after a successful commit.

mod groups;
mod recipes;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use recipebox_auth::{Capability, MembershipResolver, Principal, RolePolicy};
use recipebox_storage::{RecordStore, RecordTransaction, StorageResult};

use crate::cache::CacheCoordinator;
use crate::error::{ServiceError, ServiceResult};

/// Orchestrates the access gates, the system of record and the cache.
#[derive(Clone)]
pub struct ResourceService {
    store: Arc<dyn RecordStore>,
    policy: RolePolicy,
    membership: MembershipResolver,
    cache: CacheCoordinator,
    storage_timeout: Duration,
}

impl ResourceService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        cache: CacheCoordinator,
        storage_timeout: Duration,
    ) -> Self {
        Self {
            membership: MembershipResolver::new(Arc::clone(&store), storage_timeout),
            store,
            policy: RolePolicy::new(),
            cache,
            storage_timeout,
        }
    }

    pub fn cache(&self) -> &CacheCoordinator {
        &self.cache
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Role gate. Runs before anything touches storage.
    fn gate(&self, principal: &Principal, capability: Capability) -> ServiceResult<()> {
        self.policy
            .check(principal, capability)
            .into_result()
            .map_err(ServiceError::from)
    }

    /// Run one storage call under the storage timeout. A timeout is a
    /// failure of the operation, never a deny.
    async fn storage<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = StorageResult<T>>,
    ) -> ServiceResult<T> {
        match tokio::time::timeout(self.storage_timeout, fut).await {
            Ok(result) => result.map_err(ServiceError::from),
            Err(_) => {
                tracing::error!(op, timeout = ?self.storage_timeout, "storage call timed out");
                Err(ServiceError::internal(format!("{op} timed out")))
            }
        }
    }

    async fn begin(&self) -> ServiceResult<Box<dyn RecordTransaction>> {
        self.storage("begin", self.store.begin()).await
    }

    /// Commit on success, roll back on failure.
    async fn finish<T>(
        &self,
        tx: Box<dyn RecordTransaction>,
        result: ServiceResult<T>,
    ) -> ServiceResult<T> {
        match result {
            Ok(value) => {
                self.storage("commit", tx.commit()).await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.storage("rollback", tx.rollback()).await {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
