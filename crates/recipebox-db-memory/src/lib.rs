//! In-memory system-of-record backend for RecipeBox.
//!
//! Implements [`RecordStore`](recipebox_storage::RecordStore) on top of
//! ordered maps guarded by a single `RwLock`. Used by tests and by the server
//! when no external database is configured.
//!
//! ```ignore
//! use recipebox_db_memory::InMemoryStore;
//! use recipebox_storage::RecordStore;
//!
//! let store = InMemoryStore::new();
//! let mut tx = store.begin().await?;
//! tx.insert_group(&group).await?;
//! tx.commit().await?;
//! ```

pub mod storage;
mod tables;
pub mod transaction;

pub use recipebox_storage::{RecordStore, RecordTransaction, StorageError};
pub use storage::{InMemoryStore, TransactionStats};
pub use transaction::InMemoryTransaction;
