//! # recipebox-storage
//!
//! System-of-record interface for RecipeBox.
//!
//! This crate defines the traits and types that storage backends implement.
//! It contains no implementation; see `recipebox-db-memory`.
//!
//! Reads go through [`RecordStore`]. Every write goes through a
//! [`RecordTransaction`] obtained from [`RecordStore::begin`], so multi-record
//! changes such as "create a group and add its owner" land atomically.

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError, StorageResult};
pub use traits::{RecordStore, RecordTransaction};
pub use types::{Lookup, RecipeFilter};
