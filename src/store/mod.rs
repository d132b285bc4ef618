//! Storage abstraction for complaint records.
//!
//! The [`ComplaintStore`] trait defines the two operations the service
//! needs, keyed insert and point lookup, enabling pluggable backends
//! (SQLite in production, in-memory for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Complaint;

pub use memory::InMemoryComplaintStore;
pub use sqlite::SqliteComplaintStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same `complaint_id` already exists.
    #[error("duplicate complaint id: {0}")]
    DuplicateId(String),
    #[error("complaint not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Abstract record store for complaints.
///
/// Single-row atomicity only; no cross-record invariants exist, so
/// concurrent inserts and lookups from independent sessions need no
/// coordination beyond what the backend provides.
#[async_trait]
pub trait ComplaintStore: Send + Sync {
    /// Persist a new complaint. Fails with [`StoreError::DuplicateId`]
    /// if the id is already taken.
    async fn insert(&self, complaint: &Complaint) -> Result<(), StoreError>;

    /// Fetch a complaint by exact id.
    async fn get(&self, id: &str) -> Result<Complaint, StoreError>;
}
