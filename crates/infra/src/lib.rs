//! Infrastructure layer: state store, Sheets client, notifier, run orchestration.

pub mod config;
pub mod notify;
pub mod runner;
pub mod sheets;
pub mod store;

pub use config::{BalanceCheckSpec, StreamConfigError, StreamSpec, builtin_streams, load_streams_file, resolve_streams};
pub use notify::{FailedDelivery, FailedDeliveryLog, Notifier, NotifierError, RecordingNotifier, WebhookNotifier};
pub use runner::{DeliveryOutcome, Orchestrator, Redelivery, RunError, RunReport, WatchConfig, WatchStats, watch};
pub use sheets::{FetchError, SheetsClient, SheetsSnapshotSource, SnapshotSource, TokenProvider};
pub use store::{CipherError, FileSnapshotStore, InMemorySnapshotStore, SnapshotStore, StateCipher, StoreError};
