//! Store client interface.
//!
//! A [`RecordManager`] is the driver side of the mapper: it persists and
//! queries native records. Real engines live outside this crate; the
//! in-memory manager backs tests and demos.

pub mod memory;
pub mod pattern;

use async_trait::async_trait;

use crate::core::{Record, Result};
use crate::query::{Condition, DeleteQuery, SelectQuery};

pub use memory::InMemoryRecordManager;

#[async_trait]
pub trait RecordManager: Send + Sync {
    /// Stores a new record and returns it as stored.
    async fn insert(&self, record: Record) -> Result<Record>;

    /// Replaces the stored records whose `id_key` value equals the one in
    /// `record`, inserting it when none matches.
    async fn update(&self, record: Record, id_key: &str) -> Result<Record>;

    async fn select(&self, query: &SelectQuery) -> Result<Vec<Record>>;

    /// Deletes matching records and returns how many were removed.
    async fn delete(&self, query: &DeleteQuery) -> Result<u64>;

    /// Number of records stored under `name`, restricted to those matching
    /// `condition` when one is given.
    async fn count(&self, name: &str, condition: Option<&Condition>) -> Result<u64>;
}
