use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stockwatch_core::{DomainError, Entity, ValueObject};

/// Inventory item key (e.g. a SKU or the sheet column label).
///
/// Keys are trimmed on construction; an empty key is rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemKey(String);

impl ItemKey {
    pub fn new(key: impl AsRef<str>) -> Result<Self, DomainError> {
        let key = key.as_ref().trim();
        if key.is_empty() {
            return Err(DomainError::validation("item key cannot be empty"));
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a configured label.
    pub fn matches(&self, label: &str) -> bool {
        self.0.eq_ignore_ascii_case(label.trim())
    }
}

impl core::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ItemKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ItemKey> for String {
    fn from(value: ItemKey) -> Self {
        value.0
    }
}

/// Stock quantity: finite and non-negative.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Quantity(f64);

impl ValueObject for Quantity {}

impl Quantity {
    pub const ZERO: Quantity = Quantity(0.0);

    pub fn new(value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() {
            return Err(DomainError::validation(format!(
                "quantity must be finite, got {value}"
            )));
        }
        if value < 0.0 {
            return Err(DomainError::validation(format!(
                "quantity cannot be negative, got {value}"
            )));
        }
        // Normalize -0.0 so equality and serialization stay stable.
        Ok(Self(value + 0.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Quantity {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for f64 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

/// Unit a quantity is counted in.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    #[default]
    Pieces,
    Kilograms,
}

impl ValueObject for Unit {}

/// One inventory line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    key: ItemKey,
    quantity: Quantity,
    #[serde(default)]
    unit: Unit,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, String>,
}

impl Item {
    pub fn new(key: ItemKey, quantity: Quantity) -> Self {
        Self {
            key,
            quantity,
            unit: Unit::default(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// True when everything except the quantity is identical.
    pub fn same_description(&self, other: &Item) -> bool {
        self.unit == other.unit && self.attributes == other.attributes
    }
}

impl Entity for Item {
    type Id = ItemKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }
}
