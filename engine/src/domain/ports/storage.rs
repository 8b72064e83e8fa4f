//! Storage collaborator port trait
//!
//! The engine hands each completed snapshot to storage whole, after the
//! batch joins; it never queries storage mid-fetch.

use async_trait::async_trait;

use crate::domain::entities::{EntitySnapshot, SourceId};
use crate::error::StorageError;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist (upsert) one snapshot, keyed by its source identifier and
    /// the entities' natural identifiers within it.
    async fn persist(
        &self,
        id: &SourceId,
        snapshot: &EntitySnapshot,
    ) -> Result<(), StorageError>;
}
