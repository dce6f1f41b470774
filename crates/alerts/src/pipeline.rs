use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use tracing::debug;

use stockwatch_inventory::Snapshot;

use crate::change::Diff;
use crate::classifier::{AlertEvent, Classifier, ClassifierConfig};
use crate::diff::{DEFAULT_EPSILON, DiffEngine};
use crate::error::{ConfigError, DiffError};
use crate::formatter::{Formatter, FormatterConfig, MessagePayload, RenderContext};

/// Alerting configuration shared by every stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub epsilon: f64,
    pub classifier: ClassifierConfig,
    pub formatter: FormatterConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            classifier: ClassifierConfig::default(),
            formatter: FormatterConfig::default(),
        }
    }
}

/// Everything one evaluation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub diff: Diff,
    pub events: Vec<AlertEvent>,
    pub payloads: Vec<MessagePayload>,
}

/// Diff → classify → format, as one deterministic step.
#[derive(Debug, Clone)]
pub struct AlertPipeline {
    engine: DiffEngine,
    classifier: Classifier,
    formatter: Formatter,
}

impl AlertPipeline {
    /// Validates the whole configuration up front.
    pub fn new(config: &PipelineConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            engine: DiffEngine::new(config.epsilon)?,
            classifier: Classifier::new(config.classifier.clone())?,
            formatter: Formatter::new(config.formatter.clone())?,
        })
    }

    pub fn evaluate(
        &self,
        previous: Option<&Snapshot>,
        ctx: &RenderContext<'_>,
    ) -> Result<Evaluation, DiffError> {
        let diff = self.engine.diff(previous, ctx.current)?;
        let events = self.classifier.classify(&diff);
        let payloads = self.formatter.format(&events, ctx);

        debug!(
            stream = %diff.stream,
            cold_start = diff.cold_start,
            summary = %diff.summary(),
            events = events.len(),
            payloads = payloads.len(),
            "evaluated snapshot"
        );

        Ok(Evaluation {
            diff,
            events,
            payloads,
        })
    }

    /// Re-render already classified events, e.g. once extra context is known.
    pub fn render(&self, events: &[AlertEvent], ctx: &RenderContext<'_>) -> Vec<MessagePayload> {
        self.formatter.format(events, ctx)
    }

    /// Local offset for periods and timestamps.
    pub fn utc_offset(&self) -> FixedOffset {
        self.formatter.offset()
    }
}
