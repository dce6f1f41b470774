use serde::{Deserialize, Serialize};

use crate::change::{ChangeKind, ChangeRecord, Diff};
use crate::error::ConfigError;
use crate::render;

/// Noise-suppression policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Quantity changes with `|delta|` below this are not reported.
    pub min_quantity_delta_to_report: f64,
    /// Whether attribute-only changes become alerts at all.
    pub report_attribute_changes: bool,
    /// Whether new and vanished items become alerts.
    pub report_additions_removals: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_quantity_delta_to_report: 0.0,
            report_attribute_changes: true,
            report_additions_removals: true,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let min = self.min_quantity_delta_to_report;
        if !(min.is_finite() && min >= 0.0) {
            return Err(ConfigError::InvalidMinDelta(min));
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

/// A change that passed filtering and will be reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub category: ChangeKind,
    pub severity: Severity,
    pub record: ChangeRecord,
    /// Rendered bullet line for this item.
    pub line: String,
}

/// Maps change records to alert events.
#[derive(Debug, Clone, PartialEq)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// One event per reportable record, in record order.
    ///
    /// A cold-start diff never yields events: there is nothing to compare against.
    pub fn classify(&self, diff: &Diff) -> Vec<AlertEvent> {
        if diff.cold_start {
            return Vec::new();
        }
        diff.records
            .iter()
            .filter(|r| self.is_reportable(r))
            .map(|r| AlertEvent {
                category: r.kind,
                severity: severity(r),
                record: r.clone(),
                line: render::describe(r),
            })
            .collect()
    }

    fn is_reportable(&self, record: &ChangeRecord) -> bool {
        match record.kind {
            ChangeKind::Unchanged => false,
            ChangeKind::Added | ChangeKind::Removed => self.config.report_additions_removals,
            ChangeKind::AttributeChanged => self.config.report_attribute_changes,
            ChangeKind::QuantityChanged => record
                .delta
                .is_some_and(|d| d.abs() >= self.config.min_quantity_delta_to_report),
        }
    }
}

fn severity(record: &ChangeRecord) -> Severity {
    match record.kind {
        ChangeKind::Removed => Severity::Warning,
        ChangeKind::QuantityChanged if record.delta.is_some_and(|d| d < 0.0) => Severity::Warning,
        _ => Severity::Info,
    }
}
