//! Tracing/logging setup shared by the binaries.

pub mod tracing;

pub use tracing::{LogFormat, ParseLogFormatError};

/// Initialize process-wide logging.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(format: LogFormat) {
    tracing::init(format);
}
