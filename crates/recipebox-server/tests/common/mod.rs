#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use recipebox_auth::{Principal, Role};
use recipebox_core::{Group, Membership, RecipeDraft, UserId, Visibility};
use recipebox_db_memory::InMemoryStore;
use recipebox_server::cache::{CacheError, CacheStore};
use recipebox_server::{CacheCoordinator, LocalCacheStore, ResourceService};
use recipebox_storage::RecordStore;

pub const OP_TIMEOUT: Duration = Duration::from_millis(200);
pub const STORAGE_TIMEOUT: Duration = Duration::from_secs(2);

pub struct Harness {
    pub service: ResourceService,
    pub store: InMemoryStore,
    pub cache: Arc<LocalCacheStore>,
}

pub fn harness() -> Harness {
    let store = InMemoryStore::new();
    let cache = Arc::new(LocalCacheStore::new());
    let service = service_with(Arc::new(store.clone()), cache.clone());
    Harness {
        service,
        store,
        cache,
    }
}

pub fn service_with(store: Arc<dyn RecordStore>, cache: Arc<dyn CacheStore>) -> ResourceService {
    let coordinator = CacheCoordinator::new(cache, Duration::from_secs(300), OP_TIMEOUT);
    ResourceService::new(store, coordinator, STORAGE_TIMEOUT)
}

pub fn principal(role: Role) -> Principal {
    Principal::new(UserId::new(), role)
}

pub fn draft(title: &str, visibility: Visibility) -> RecipeDraft {
    RecipeDraft {
        title: title.to_string(),
        ingredients: vec!["200g flour".into(), "1 egg".into()],
        instructions: "Mix and bake.".into(),
        image_url: Some("https://images.example/recipe.png".into()),
        visibility,
    }
}

/// A group owned by `owner` with `members` added directly in storage.
pub async fn seed_group(store: &InMemoryStore, owner: UserId, members: &[UserId]) -> Group {
    let group = Group::new(owner, "The Smiths").unwrap();
    let mut tx = store.begin().await.unwrap();
    tx.insert_group(&group).await.unwrap();
    tx.insert_membership(&Membership::new(owner, group.id))
        .await
        .unwrap();
    for member in members {
        tx.insert_membership(&Membership::new(*member, group.id))
            .await
            .unwrap();
    }
    tx.commit().await.unwrap();
    group
}

/// A cache store that is always unreachable.
pub struct DownCache;

#[async_trait]
impl CacheStore for DownCache {
    async fn get(&self, _key: &str) -> Result<Option<Arc<Vec<u8>>>, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn delete(&self, _keys: &[String]) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<usize, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    fn mode(&self) -> &'static str {
        "down"
    }
}
