//! Persisted "previous snapshot" per stream.
//!
//! The store is read once at the start of a run and written once at the end
//! of a successful run. At most one run touches a stream at a time (an
//! external guarantee), so implementations do no cross-process locking.

pub mod cipher;
pub mod file;
pub mod in_memory;
pub mod r#trait;

pub use cipher::{CipherError, StateCipher};
pub use file::FileSnapshotStore;
pub use in_memory::InMemorySnapshotStore;
pub use r#trait::{SnapshotStore, StoreError};
