//! Inventory snapshot model.
//!
//! This crate turns raw spreadsheet values into validated, immutable
//! [`Snapshot`]s, implemented purely as deterministic logic (no IO, no HTTP,
//! no storage).

pub mod balance;
pub mod item;
pub mod layout;
pub mod snapshot;

pub use balance::{BalanceComparison, RecordsBalance, RecordsLayout};
pub use item::{Item, ItemKey, Quantity, Unit};
pub use layout::{Grid, InvalidCells, LayoutError, PinnedCell, SheetLayout, UnitPolicy, parse_quantity};
pub use snapshot::{Snapshot, SnapshotError};
