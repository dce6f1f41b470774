use thiserror::Error;

use stockwatch_core::StreamId;

/// Invalid alerting configuration. Raised at startup, before any fetch.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("epsilon must be a finite number >= 0, got {0}")]
    InvalidEpsilon(f64),

    #[error("min_quantity_delta_to_report must be a finite number >= 0, got {0}")]
    InvalidMinDelta(f64),

    #[error("max_payload_bytes must be greater than zero")]
    InvalidMaxPayload,

    #[error("utc offset of {0} seconds is out of range")]
    InvalidUtcOffset(i32),

    #[error("pieces_per_bag must be greater than zero")]
    InvalidBagSize,
}

/// The two snapshots cannot be compared.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiffError {
    #[error("cannot diff stream '{current}' against a snapshot of stream '{previous}'")]
    StreamMismatch { previous: StreamId, current: StreamId },
}
