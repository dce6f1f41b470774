//! Run orchestration: one-shot runs and the polling loop.

pub mod orchestrator;
pub mod watch;

pub use orchestrator::{DeliveryOutcome, Orchestrator, Redelivery, RunError, RunReport};
pub use watch::{WatchConfig, WatchStats, watch};
