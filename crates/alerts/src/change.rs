use serde::Serialize;

use stockwatch_core::StreamId;
use stockwatch_inventory::{Item, ItemKey};

/// What happened to one item key between two snapshots.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    QuantityChanged,
    Added,
    Removed,
    AttributeChanged,
    Unchanged,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::QuantityChanged => "quantity_changed",
            ChangeKind::Added => "added",
            ChangeKind::Removed => "removed",
            ChangeKind::AttributeChanged => "attribute_changed",
            ChangeKind::Unchanged => "unchanged",
        }
    }
}

/// Raw per-item delta.
///
/// `previous` is `None` for [`ChangeKind::Added`], `current` is `None` for
/// [`ChangeKind::Removed`]. `delta` is only set for
/// [`ChangeKind::QuantityChanged`] and is `current - previous`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    pub key: ItemKey,
    pub kind: ChangeKind,
    pub previous: Option<Item>,
    pub current: Option<Item>,
    pub delta: Option<f64>,
}

/// Ordered change records for one stream, key-ascending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diff {
    pub stream: StreamId,
    /// No previous snapshot existed; every record is `Added`.
    pub cold_start: bool,
    pub records: Vec<ChangeRecord>,
}

/// Record counts per kind.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub quantity_changed: usize,
    pub attribute_changed: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    /// Number of records that are not `Unchanged`.
    pub fn changed(&self) -> usize {
        self.added + self.removed + self.quantity_changed + self.attribute_changed
    }
}

impl core::fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "+{} -{} ~{} attr:{} ={}",
            self.added, self.removed, self.quantity_changed, self.attribute_changed, self.unchanged
        )
    }
}

impl Diff {
    pub fn summary(&self) -> DiffSummary {
        let mut s = DiffSummary::default();
        for r in &self.records {
            match r.kind {
                ChangeKind::Added => s.added += 1,
                ChangeKind::Removed => s.removed += 1,
                ChangeKind::QuantityChanged => s.quantity_changed += 1,
                ChangeKind::AttributeChanged => s.attribute_changed += 1,
                ChangeKind::Unchanged => s.unchanged += 1,
            }
        }
        s
    }

    pub fn has_changes(&self) -> bool {
        self.records.iter().any(|r| r.kind != ChangeKind::Unchanged)
    }
}
