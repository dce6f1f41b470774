//! Sheet layouts: how a grid of cell values maps onto inventory items.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockwatch_core::StreamId;

use crate::item::{Item, ItemKey, Quantity, Unit};
use crate::snapshot::{Snapshot, SnapshotError};

/// Raw cell values, row-major, as returned by the spreadsheet API.
///
/// Rows may be ragged: the API drops trailing empty cells.
pub type Grid = Vec<Vec<String>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("sheet has no row {0}")]
    MissingRow(usize),

    #[error("sheet has no column named '{0}'")]
    MissingColumn(String),

    #[error("invalid quantity '{value}' for '{key}'")]
    InvalidQuantity { key: String, value: String },

    #[error("invalid item key: {0}")]
    InvalidKey(String),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// A fixed cell of the values row published as its own item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedCell {
    pub key: String,
    pub column: usize,
}

/// Grid → items mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SheetLayout {
    /// One item per column: the label comes from `labels_row`, the quantity
    /// from the same column of `values_row`.
    Columns {
        labels_row: usize,
        values_row: usize,
        #[serde(default)]
        first_column: usize,
        #[serde(default)]
        skip_labels: Vec<String>,
        #[serde(default)]
        pinned: Vec<PinnedCell>,
    },
    /// One item per row below the header; remaining columns become attributes.
    Rows {
        #[serde(default)]
        header_row: usize,
        key_column: String,
        quantity_column: String,
    },
}

/// Which unit each item is counted in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPolicy {
    #[serde(default)]
    pub default_unit: Unit,
    /// Per-key overrides, matched case-insensitively.
    #[serde(default)]
    pub overrides: BTreeMap<String, Unit>,
}

impl UnitPolicy {
    pub fn uniform(unit: Unit) -> Self {
        Self {
            default_unit: unit,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, key: impl Into<String>, unit: Unit) -> Self {
        self.overrides.insert(key.into(), unit);
        self
    }

    pub fn unit_for(&self, key: &ItemKey) -> Unit {
        self.overrides
            .iter()
            .find(|(label, _)| key.matches(label))
            .map(|(_, unit)| *unit)
            .unwrap_or(self.default_unit)
    }
}

/// What to do with a quantity cell that is not a number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidCells {
    /// Fail the whole parse.
    #[default]
    Reject,
    /// Leave the item out and list its key in [`Snapshot::unreadable`].
    Skip,
}

/// Items parsed so far plus the keys whose cells were skipped.
#[derive(Default)]
struct Collected {
    items: Vec<Item>,
    skipped: Vec<ItemKey>,
}

impl Collected {
    fn push(&mut self, label: &str, raw: &str, units: &UnitPolicy, invalid: InvalidCells) -> Result<(), LayoutError> {
        match build_item(label, raw, units) {
            Ok(item) => self.items.push(item),
            Err(LayoutError::InvalidQuantity { .. }) if invalid == InvalidCells::Skip => {
                self.skipped.push(ItemKey::new(label).map_err(|e| LayoutError::InvalidKey(e.to_string()))?);
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

impl SheetLayout {
    /// Build a snapshot from a grid. Any non-numeric quantity fails the parse.
    pub fn parse(
        &self,
        grid: &Grid,
        stream: &StreamId,
        taken_at: DateTime<Utc>,
        units: &UnitPolicy,
    ) -> Result<Snapshot, LayoutError> {
        self.parse_with(grid, stream, taken_at, units, InvalidCells::Reject)
    }

    pub fn parse_with(
        &self,
        grid: &Grid,
        stream: &StreamId,
        taken_at: DateTime<Utc>,
        units: &UnitPolicy,
        invalid: InvalidCells,
    ) -> Result<Snapshot, LayoutError> {
        let collected = match self {
            SheetLayout::Columns {
                labels_row,
                values_row,
                first_column,
                skip_labels,
                pinned,
            } => parse_columns(grid, *labels_row, *values_row, *first_column, skip_labels, pinned, units, invalid)?,
            SheetLayout::Rows {
                header_row,
                key_column,
                quantity_column,
            } => parse_rows(grid, *header_row, key_column, quantity_column, units, invalid)?,
        };

        Ok(Snapshot::new(stream.clone(), taken_at, collected.items)?.with_unreadable(collected.skipped))
    }
}

#[allow(clippy::too_many_arguments)]
fn parse_columns(
    grid: &Grid,
    labels_row: usize,
    values_row: usize,
    first_column: usize,
    skip_labels: &[String],
    pinned: &[PinnedCell],
    units: &UnitPolicy,
    invalid: InvalidCells,
) -> Result<Collected, LayoutError> {
    let labels = grid.get(labels_row).ok_or(LayoutError::MissingRow(labels_row))?;
    let values = grid.get(values_row).ok_or(LayoutError::MissingRow(values_row))?;

    let mut out = Collected::default();
    for (col, label) in labels.iter().enumerate().skip(first_column) {
        let label = label.trim();
        if label.is_empty() || skip_labels.iter().any(|s| s.trim().eq_ignore_ascii_case(label)) {
            continue;
        }
        let raw = values.get(col).map(String::as_str).unwrap_or("");
        out.push(label, raw, units, invalid)?;
    }

    for cell in pinned {
        let raw = values.get(cell.column).map(String::as_str).unwrap_or("");
        out.push(&cell.key, raw, units, invalid)?;
    }

    Ok(out)
}

fn parse_rows(
    grid: &Grid,
    header_row: usize,
    key_column: &str,
    quantity_column: &str,
    units: &UnitPolicy,
    invalid: InvalidCells,
) -> Result<Collected, LayoutError> {
    let header = grid.get(header_row).ok_or(LayoutError::MissingRow(header_row))?;
    let find = |name: &str| {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| LayoutError::MissingColumn(name.to_string()))
    };
    let key_idx = find(key_column)?;
    let qty_idx = find(quantity_column)?;

    let mut out = Collected::default();
    for row in grid.iter().skip(header_row + 1) {
        let key = row.get(key_idx).map(|s| s.trim()).unwrap_or("");
        if key.is_empty() {
            // Blank separator rows are common in hand-maintained sheets.
            continue;
        }
        let raw = row.get(qty_idx).map(String::as_str).unwrap_or("");
        let mut item = match build_item(key, raw, units) {
            Ok(item) => item,
            Err(LayoutError::InvalidQuantity { .. }) if invalid == InvalidCells::Skip => {
                out.skipped.push(ItemKey::new(key).map_err(|e| LayoutError::InvalidKey(e.to_string()))?);
                continue;
            }
            Err(e) => return Err(e),
        };

        for (idx, name) in header.iter().enumerate() {
            let name = name.trim();
            if idx == key_idx || idx == qty_idx || name.is_empty() {
                continue;
            }
            if let Some(value) = row.get(idx).map(|v| v.trim()).filter(|v| !v.is_empty()) {
                item = item.with_attribute(name, value);
            }
        }
        out.items.push(item);
    }

    Ok(out)
}

fn build_item(label: &str, raw: &str, units: &UnitPolicy) -> Result<Item, LayoutError> {
    let key = ItemKey::new(label).map_err(|e| LayoutError::InvalidKey(e.to_string()))?;
    let invalid = || LayoutError::InvalidQuantity {
        key: label.trim().to_string(),
        value: raw.to_string(),
    };
    let value = parse_quantity(raw).ok_or_else(invalid)?;
    let quantity = Quantity::new(value).map_err(|_| invalid())?;
    let unit = units.unit_for(&key);
    Ok(Item::new(key, quantity).with_unit(unit))
}

/// Parse a quantity cell: trims, drops `,` thousands separators, treats an
/// empty cell as zero. Returns `None` for anything non-numeric.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Some(0.0);
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
