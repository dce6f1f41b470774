use std::collections::HashMap;
use std::sync::RwLock;

use stockwatch_core::StreamId;
use stockwatch_inventory::Snapshot;

use super::r#trait::{SnapshotStore, StoreError};

/// In-memory snapshot store.
///
/// Intended for tests/dev. Also counts saves so tests can assert that a
/// failed run left the state untouched.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<HashMap<StreamId, Snapshot>>,
    saves: RwLock<u64>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stream's previous state.
    pub fn with_snapshot(self, snapshot: Snapshot) -> Self {
        if let Ok(mut map) = self.snapshots.write() {
            map.insert(snapshot.stream().clone(), snapshot);
        }
        self
    }

    pub fn get(&self, stream: &StreamId) -> Option<Snapshot> {
        self.snapshots.read().ok()?.get(stream).cloned()
    }

    pub fn save_count(&self) -> u64 {
        self.saves.read().map(|n| *n).unwrap_or(0)
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn load(&self, stream: &StreamId) -> Result<Option<Snapshot>, StoreError> {
        let map = self.snapshots.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(stream).cloned())
    }

    fn save(&self, stream: &StreamId, snapshot: &Snapshot) -> Result<(), StoreError> {
        let mut map = self.snapshots.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(stream.clone(), snapshot.clone());
        *self.saves.write().map_err(|_| StoreError::Poisoned)? += 1;
        Ok(())
    }
}
