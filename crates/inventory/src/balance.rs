//! Cross-check of a snapshot total against the monthly inventory records.

use serde::{Deserialize, Serialize};

use crate::layout::{Grid, LayoutError, parse_quantity};

/// Where the monthly closing balance lives in the records sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordsLayout {
    /// Column holding the `YYYY-MM` period label.
    pub period_column: String,
    /// Column holding the running stock balance for the period.
    pub balance_column: String,
}

/// Balance read from the records sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordsBalance {
    pub period: String,
    pub balance: f64,
    /// False when the requested period was missing and the latest one was used.
    pub exact_period: bool,
}

impl RecordsLayout {
    /// Find the balance for `period`, falling back to the most recent period
    /// present in the sheet.
    pub fn balance_for(&self, grid: &Grid, period: &str) -> Result<RecordsBalance, LayoutError> {
        let header = grid.first().ok_or(LayoutError::MissingRow(0))?;
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| LayoutError::MissingColumn(name.to_string()))
        };
        let period_idx = find(&self.period_column)?;
        let balance_idx = find(&self.balance_column)?;

        let cell = |row: &[String], idx: usize| row.get(idx).map(|s| s.trim().to_string()).unwrap_or_default();
        let rows = grid.iter().skip(1).filter(|row| !cell(row, period_idx).is_empty());

        let (row, exact_period) = match rows.clone().find(|row| cell(row, period_idx) == period) {
            Some(row) => (row, true),
            None => (
                rows.max_by(|a, b| cell(a, period_idx).cmp(&cell(b, period_idx)))
                    .ok_or(LayoutError::MissingRow(1))?,
                false,
            ),
        };

        let raw = cell(row, balance_idx);
        let period = cell(row, period_idx);
        let balance = match parse_quantity(&raw) {
            Some(value) if !raw.is_empty() => value,
            _ => {
                return Err(LayoutError::InvalidQuantity {
                    key: self.balance_column.clone(),
                    value: raw,
                });
            }
        };

        Ok(RecordsBalance {
            period,
            balance,
            exact_period,
        })
    }
}

/// Snapshot total vs. records balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceComparison {
    pub period: String,
    pub sheet_total: f64,
    pub records_total: f64,
}

impl BalanceComparison {
    pub fn new(sheet_total: f64, records: &RecordsBalance) -> Self {
        Self {
            period: records.period.clone(),
            sheet_total,
            records_total: records.balance,
        }
    }

    /// Positive when the sheet holds more than the records.
    pub fn difference(&self) -> f64 {
        self.sheet_total - self.records_total
    }

    pub fn matches(&self) -> bool {
        self.difference().abs() < 1e-9
    }
}
