use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use stockwatch_inventory::{LayoutError, RecordsBalance, Snapshot};

use crate::config::{BalanceCheckSpec, StreamSpec};

use super::client::ValuesReader;
use super::error::FetchError;

/// Produces the current snapshot of a stream.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, spec: &StreamSpec) -> Result<Snapshot, FetchError>;

    /// Closing balance recorded for `period` (or the latest period present).
    async fn fetch_balance(&self, check: &BalanceCheckSpec, period: &str) -> Result<RecordsBalance, FetchError>;
}

#[async_trait]
impl<S> SnapshotSource for Arc<S>
where
    S: SnapshotSource + ?Sized,
{
    async fn fetch(&self, spec: &StreamSpec) -> Result<Snapshot, FetchError> {
        (**self).fetch(spec).await
    }

    async fn fetch_balance(&self, check: &BalanceCheckSpec, period: &str) -> Result<RecordsBalance, FetchError> {
        (**self).fetch_balance(check, period).await
    }
}

/// Reads a stream's range and parses it with the stream's layout.
#[derive(Debug)]
pub struct SheetsSnapshotSource<R> {
    reader: R,
}

impl<R: ValuesReader> SheetsSnapshotSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl<R: ValuesReader> SnapshotSource for SheetsSnapshotSource<R> {
    async fn fetch(&self, spec: &StreamSpec) -> Result<Snapshot, FetchError> {
        let grid = self.reader.values(&spec.spreadsheet_id, &spec.range).await?;
        let snapshot = spec
            .layout
            .parse_with(&grid, &spec.id, Utc::now(), &spec.units, spec.invalid_cells)
            .inspect_err(|e| {
                if let LayoutError::InvalidQuantity { key, value } = e {
                    warn!(stream = %spec.id, item = %key, value = %value, range = %spec.range, "non-numeric quantity cell");
                }
            })?;
        for key in snapshot.unreadable() {
            warn!(stream = %spec.id, item = %key, range = %spec.range, "skipping non-numeric quantity cell");
        }
        Ok(snapshot)
    }

    async fn fetch_balance(&self, check: &BalanceCheckSpec, period: &str) -> Result<RecordsBalance, FetchError> {
        let grid = self.reader.values(&check.spreadsheet_id, &check.range).await?;
        Ok(check.records.balance_for(&grid, period)?)
    }
}
