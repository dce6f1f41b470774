//! `stockwatch-alerts`
//!
//! **Responsibility:** the state-diff and alerting engine.
//!
//! - [`DiffEngine`] compares two snapshots of one stream.
//! - [`Classifier`] decides which changes are worth reporting.
//! - [`Formatter`] renders the surviving events into chat payloads.
//!
//! Everything here is pure and synchronous: the same inputs always produce the
//! same events and byte-identical payloads. IO lives in `stockwatch-infra`.

pub mod change;
pub mod classifier;
pub mod diff;
pub mod error;
pub mod formatter;
pub mod pipeline;
pub mod render;

pub use change::{ChangeKind, ChangeRecord, Diff, DiffSummary};
pub use classifier::{AlertEvent, Classifier, ClassifierConfig, Severity};
pub use diff::{DEFAULT_EPSILON, DiffEngine};
pub use error::{ConfigError, DiffError};
pub use formatter::{Formatter, FormatterConfig, MessagePayload, RenderContext};
pub use pipeline::{AlertPipeline, Evaluation, PipelineConfig};
