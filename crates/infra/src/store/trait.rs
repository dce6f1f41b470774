use std::sync::Arc;

use thiserror::Error;

use stockwatch_core::StreamId;
use stockwatch_inventory::Snapshot;

/// Snapshot store operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state io failed for stream '{stream}': {source}")]
    Io {
        stream: StreamId,
        #[source]
        source: std::io::Error,
    },

    /// Persisted bytes exist but cannot be decoded into a valid snapshot.
    #[error("persisted state for stream '{stream}' is corrupt: {reason}")]
    Corrupt { stream: StreamId, reason: String },

    #[error("state encoding failed for stream '{stream}': {reason}")]
    Encode { stream: StreamId, reason: String },

    #[error("state lock poisoned")]
    Poisoned,
}

/// Previous-state persistence, keyed by stream.
///
/// ## Semantics
///
/// - `load` returns `Ok(None)` when nothing was ever saved for the stream
///   (cold start). That is not an error.
/// - `save` replaces the stored snapshot wholesale; a reader never observes
///   a half-written snapshot.
pub trait SnapshotStore: Send + Sync {
    fn load(&self, stream: &StreamId) -> Result<Option<Snapshot>, StoreError>;

    fn save(&self, stream: &StreamId, snapshot: &Snapshot) -> Result<(), StoreError>;
}

impl<S> SnapshotStore for Arc<S>
where
    S: SnapshotStore + ?Sized,
{
    fn load(&self, stream: &StreamId) -> Result<Option<Snapshot>, StoreError> {
        (**self).load(stream)
    }

    fn save(&self, stream: &StreamId, snapshot: &Snapshot) -> Result<(), StoreError> {
        (**self).save(stream, snapshot)
    }
}
