use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockwatch_core::{Entity, StreamId};

use crate::item::{Item, ItemKey};

/// Snapshot construction error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// The same key appeared twice in one reading.
    #[error("duplicate item key '{0}'")]
    DuplicateKey(String),
}

/// One complete inventory reading of a stream at a point in time.
///
/// Items are keyed by [`ItemKey`] and kept sorted, so iteration order is
/// independent of the order the source returned them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotRepr", into = "SnapshotRepr")]
pub struct Snapshot {
    stream: StreamId,
    taken_at: DateTime<Utc>,
    items: BTreeMap<ItemKey, Item>,
    /// Keys whose cell could not be read this time. Never persisted.
    unreadable: BTreeSet<ItemKey>,
}

impl Snapshot {
    pub fn new(
        stream: StreamId,
        taken_at: DateTime<Utc>,
        items: impl IntoIterator<Item = Item>,
    ) -> Result<Self, SnapshotError> {
        let mut map = BTreeMap::new();
        for item in items {
            let key = item.id().clone();
            if map.insert(key.clone(), item).is_some() {
                return Err(SnapshotError::DuplicateKey(key.to_string()));
            }
        }
        Ok(Self {
            stream,
            taken_at,
            items: map,
            unreadable: BTreeSet::new(),
        })
    }

    /// Mark keys that were present in the source but had no usable value.
    pub fn with_unreadable(mut self, keys: impl IntoIterator<Item = ItemKey>) -> Self {
        self.unreadable.extend(keys.into_iter().filter(|k| !self.items.contains_key(k)));
        self
    }

    pub fn unreadable(&self) -> impl Iterator<Item = &ItemKey> {
        self.unreadable.iter()
    }

    /// Fill unreadable keys with their item from `previous`, so a bad cell
    /// reads as "unchanged" rather than "removed". Returns how many were
    /// filled; the unreadable set is cleared either way.
    pub fn carry_over(&mut self, previous: &Snapshot) -> usize {
        let mut filled = 0;
        for key in std::mem::take(&mut self.unreadable) {
            if let Some(item) = previous.get(&key) {
                self.items.insert(key, item.clone());
                filled += 1;
            }
        }
        filled
    }

    pub fn stream(&self) -> &StreamId {
        &self.stream
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Items in key-ascending order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ItemKey> {
        self.items.keys()
    }

    pub fn get(&self, key: &ItemKey) -> Option<&Item> {
        self.items.get(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all quantities, skipping keys that match `exclude` (case-insensitive).
    pub fn total(&self, exclude: &[String]) -> f64 {
        self.items
            .values()
            .filter(|item| !exclude.iter().any(|label| item.key().matches(label)))
            .map(|item| item.quantity().value())
            .sum()
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct SnapshotRepr {
    stream: StreamId,
    taken_at: DateTime<Utc>,
    items: Vec<Item>,
}

impl TryFrom<SnapshotRepr> for Snapshot {
    type Error = SnapshotError;

    fn try_from(repr: SnapshotRepr) -> Result<Self, Self::Error> {
        Snapshot::new(repr.stream, repr.taken_at, repr.items)
    }
}

impl From<Snapshot> for SnapshotRepr {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            stream: snapshot.stream,
            taken_at: snapshot.taken_at,
            items: snapshot.items.into_values().collect(),
        }
    }
}
