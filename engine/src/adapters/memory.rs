//! In-memory snapshot store
//!
//! Reference implementation of the storage port. Real deployments plug a
//! database-backed collaborator in behind the same trait.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::entities::{EntitySnapshot, SourceId};
use crate::domain::ports::SnapshotStore;
use crate::error::StorageError;

#[derive(Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<HashMap<SourceId, EntitySnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &SourceId) -> Option<EntitySnapshot> {
        self.snapshots
            .read()
            .expect("snapshot store poisoned")
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().expect("snapshot store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn persist(
        &self,
        id: &SourceId,
        snapshot: &EntitySnapshot,
    ) -> Result<(), StorageError> {
        self.snapshots
            .write()
            .map_err(|_| StorageError("snapshot store poisoned".to_string()))?
            .insert(id.clone(), snapshot.clone());
        Ok(())
    }
}
