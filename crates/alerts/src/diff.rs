use std::collections::BTreeSet;

use stockwatch_inventory::{Item, ItemKey, Snapshot};

use crate::change::{ChangeKind, ChangeRecord, Diff};
use crate::error::{ConfigError, DiffError};

/// Default tolerance for quantity comparison.
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Snapshot comparison.
///
/// Model:
/// - Walk the union of keys of both snapshots in ascending order.
/// - A quantity moves only if `|delta| >= epsilon` (and is non-zero).
/// - Otherwise a differing unit or attribute set is an attribute change.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DiffEngine {
    epsilon: f64,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl DiffEngine {
    pub fn new(epsilon: f64) -> Result<Self, ConfigError> {
        if !(epsilon.is_finite() && epsilon >= 0.0) {
            return Err(ConfigError::InvalidEpsilon(epsilon));
        }
        Ok(Self { epsilon })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Compare `current` against `previous`.
    ///
    /// With no previous snapshot every current item is reported `Added` and
    /// the diff is flagged as a cold start.
    pub fn diff(&self, previous: Option<&Snapshot>, current: &Snapshot) -> Result<Diff, DiffError> {
        let Some(previous) = previous else {
            let records = current
                .items()
                .map(|item| ChangeRecord {
                    key: item.key().clone(),
                    kind: ChangeKind::Added,
                    previous: None,
                    current: Some(item.clone()),
                    delta: None,
                })
                .collect();
            return Ok(Diff {
                stream: current.stream().clone(),
                cold_start: true,
                records,
            });
        };

        if previous.stream() != current.stream() {
            return Err(DiffError::StreamMismatch {
                previous: previous.stream().clone(),
                current: current.stream().clone(),
            });
        }

        let keys: BTreeSet<&ItemKey> = previous.keys().chain(current.keys()).collect();
        let records = keys
            .into_iter()
            .map(|key| self.compare(key, previous.get(key), current.get(key)))
            .collect();

        Ok(Diff {
            stream: current.stream().clone(),
            cold_start: false,
            records,
        })
    }

    fn compare(&self, key: &ItemKey, previous: Option<&Item>, current: Option<&Item>) -> ChangeRecord {
        let (kind, delta) = match (previous, current) {
            (None, Some(_)) => (ChangeKind::Added, None),
            (Some(_), None) => (ChangeKind::Removed, None),
            (Some(p), Some(c)) => {
                let delta = c.quantity().value() - p.quantity().value();
                if self.quantity_moved(delta) {
                    (ChangeKind::QuantityChanged, Some(delta))
                } else if !p.same_description(c) {
                    (ChangeKind::AttributeChanged, None)
                } else {
                    (ChangeKind::Unchanged, None)
                }
            }
            // Keys come from the union of both snapshots.
            (None, None) => unreachable!("key {key} missing from both snapshots"),
        };

        ChangeRecord {
            key: key.clone(),
            kind,
            previous: previous.cloned(),
            current: current.cloned(),
            delta,
        }
    }

    fn quantity_moved(&self, delta: f64) -> bool {
        delta != 0.0 && delta.abs() >= self.epsilon
    }
}
