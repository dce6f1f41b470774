//! Stream definitions: which sheet to read, how to parse it, how to render it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockwatch_alerts::ConfigError;
use stockwatch_core::StreamId;
use stockwatch_inventory::{InvalidCells, PinnedCell, RecordsLayout, SheetLayout, Unit, UnitPolicy};

#[derive(Debug, Error)]
pub enum StreamConfigError {
    #[error("failed to read streams file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse streams file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("no streams configured")]
    Empty,

    #[error("stream '{0}' is configured more than once")]
    Duplicate(StreamId),

    #[error("stream '{0}' has no spreadsheet id")]
    MissingSpreadsheet(StreamId),

    #[error("stream '{stream}': {source}")]
    Invalid {
        stream: StreamId,
        #[source]
        source: ConfigError,
    },
}

/// Records sheet used to cross-check a stream's total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceCheckSpec {
    /// Empty means "use the default records spreadsheet".
    #[serde(default)]
    pub spreadsheet_id: String,
    pub range: String,
    #[serde(flatten)]
    pub records: RecordsLayout,
    /// Item keys left out of the sheet total (matched case-insensitively).
    #[serde(default)]
    pub exclude_keys: Vec<String>,
}

/// One independently tracked inventory sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSpec {
    pub id: StreamId,
    /// Shown in the message header, e.g. "Stock" → "🔔 *Stock Changes Detected*".
    pub title: String,
    /// Empty means "use the default spreadsheet".
    #[serde(default)]
    pub spreadsheet_id: String,
    /// A1 range, e.g. `balance!A1:P3`.
    pub range: String,
    pub layout: SheetLayout,
    #[serde(default)]
    pub units: UnitPolicy,
    #[serde(default)]
    pub pieces_per_bag: Option<u32>,
    #[serde(default)]
    pub balance_check: Option<BalanceCheckSpec>,
    /// `skip` keeps the previous value of a non-numeric cell instead of
    /// failing the run.
    #[serde(default)]
    pub invalid_cells: InvalidCells,
}

impl StreamSpec {
    pub fn validate(&self) -> Result<(), StreamConfigError> {
        if self.spreadsheet_id.trim().is_empty() {
            return Err(StreamConfigError::MissingSpreadsheet(self.id.clone()));
        }
        if self.pieces_per_bag == Some(0) {
            return Err(StreamConfigError::Invalid {
                stream: self.id.clone(),
                source: ConfigError::InvalidBagSize,
            });
        }
        if let Some(check) = &self.balance_check {
            if check.spreadsheet_id.trim().is_empty() {
                return Err(StreamConfigError::MissingSpreadsheet(self.id.clone()));
            }
        }
        Ok(())
    }

    /// Fill empty spreadsheet ids from the process-wide defaults.
    fn with_defaults(mut self, spreadsheet_id: Option<&str>, records_id: Option<&str>) -> Self {
        if self.spreadsheet_id.trim().is_empty() {
            if let Some(id) = spreadsheet_id {
                self.spreadsheet_id = id.to_string();
            }
        }
        if let Some(check) = self.balance_check.as_mut() {
            if check.spreadsheet_id.trim().is_empty() {
                // The records usually live next to the stock sheet.
                if let Some(id) = records_id.or(spreadsheet_id) {
                    check.spreadsheet_id = id.to_string();
                }
            }
        }
        self
    }
}

/// The stock (balance) and parts streams.
pub fn builtin_streams() -> Vec<StreamSpec> {
    vec![
        StreamSpec {
            id: builtin_id("stock"),
            title: "Stock".to_string(),
            spreadsheet_id: String::new(),
            range: "balance!A1:P3".to_string(),
            layout: SheetLayout::Columns {
                labels_row: 0,
                values_row: 1,
                first_column: 0,
                skip_labels: vec!["Specification".to_string()],
                pinned: Vec::new(),
            },
            units: UnitPolicy::uniform(Unit::Pieces).with_override("Gizzard", Unit::Kilograms),
            pieces_per_bag: Some(20),
            invalid_cells: InvalidCells::Reject,
            balance_check: Some(BalanceCheckSpec {
                spreadsheet_id: String::new(),
                range: "summary!A:Z".to_string(),
                records: RecordsLayout {
                    period_column: "year_month".to_string(),
                    balance_column: "chicken_quantity_stock_balance".to_string(),
                },
                exclude_keys: vec!["Gizzard".to_string(), "Total".to_string()],
            }),
        },
        StreamSpec {
            id: builtin_id("parts"),
            title: "Parts".to_string(),
            spreadsheet_id: String::new(),
            range: "parts!A1:H3".to_string(),
            layout: SheetLayout::Columns {
                labels_row: 1,
                values_row: 0,
                first_column: 2,
                skip_labels: Vec::new(),
                pinned: vec![PinnedCell {
                    key: "Total Weights".to_string(),
                    column: 1,
                }],
            },
            units: UnitPolicy::uniform(Unit::Kilograms),
            pieces_per_bag: None,
            balance_check: None,
            invalid_cells: InvalidCells::Reject,
        },
    ]
}

fn builtin_id(id: &'static str) -> StreamId {
    // Literal ids above are file-safe.
    StreamId::new(id).unwrap_or_else(|_| unreachable!("invalid built-in stream id {id}"))
}

/// Read a JSON array of [`StreamSpec`].
pub fn load_streams_file(path: &Path) -> Result<Vec<StreamSpec>, StreamConfigError> {
    let bytes = std::fs::read(path).map_err(|source| StreamConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| StreamConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Apply defaults and validate the full set of streams.
pub fn resolve_streams(
    streams: Vec<StreamSpec>,
    spreadsheet_id: Option<&str>,
    records_id: Option<&str>,
) -> Result<Vec<StreamSpec>, StreamConfigError> {
    if streams.is_empty() {
        return Err(StreamConfigError::Empty);
    }

    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(streams.len());
    for spec in streams {
        let spec = spec.with_defaults(spreadsheet_id, records_id);
        if !seen.insert(spec.id.clone()) {
            return Err(StreamConfigError::Duplicate(spec.id));
        }
        spec.validate()?;
        out.push(spec);
    }
    Ok(out)
}
