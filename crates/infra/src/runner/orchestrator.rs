use serde::Serialize;
use thiserror::Error;
use tracing::{Instrument, info, info_span, warn};

use stockwatch_alerts::{AlertPipeline, ConfigError, DiffError, DiffSummary, MessagePayload, PipelineConfig, RenderContext};
use stockwatch_core::{RunId, StreamId};
use stockwatch_inventory::{BalanceComparison, Snapshot};

use crate::config::StreamSpec;
use crate::notify::{FailedDelivery, FailedDeliveryLog, Notifier};
use crate::sheets::{FetchError, SnapshotSource};
use crate::store::{SnapshotStore, StoreError};

/// A run that did not complete. Nothing was persisted unless the variant is
/// `Store` on save, in which case the previous state is still intact.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("diff failed: {0}")]
    Diff(#[from] DiffError),

    #[error("state store failed: {0}")]
    Store(#[from] StoreError),
}

/// What happened to the rendered messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Nothing to send (cold start, no changes, or everything gated).
    Skipped,
    Delivered { messages: usize },
    /// Delivery stopped at the first failing message; `sent` went out before it.
    Failed { sent: usize, error: String },
}

/// Re-delivery of messages left over from earlier failed runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Redelivery {
    /// Messages delivered this time.
    pub delivered: usize,
    /// Ledger entries of this stream still undelivered afterwards.
    pub pending: usize,
}

/// Outcome of one successful run over one stream.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub stream: StreamId,
    pub cold_start: bool,
    pub summary: DiffSummary,
    pub events: usize,
    /// Cells that could not be read and kept their previous value.
    pub carried_over: usize,
    pub balance: Option<BalanceComparison>,
    pub redelivery: Redelivery,
    pub delivery: DeliveryOutcome,
}

impl RunReport {
    /// True when this run's messages or earlier ones are still undelivered.
    pub fn delivery_failed(&self) -> bool {
        matches!(self.delivery, DeliveryOutcome::Failed { .. }) || self.redelivery.pending > 0
    }
}

/// Fetch → re-deliver → load → diff → classify → format → notify → save, per stream.
pub struct Orchestrator<S, T, N> {
    streams: Vec<StreamSpec>,
    pipeline: AlertPipeline,
    source: S,
    store: T,
    notifier: N,
    ledger: Option<FailedDeliveryLog>,
}

impl<S, T, N> Orchestrator<S, T, N>
where
    S: SnapshotSource,
    T: SnapshotStore,
    N: Notifier,
{
    /// Fails on invalid alerting configuration, before anything is fetched.
    pub fn new(
        streams: Vec<StreamSpec>,
        config: &PipelineConfig,
        source: S,
        store: T,
        notifier: N,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            streams,
            pipeline: AlertPipeline::new(config)?,
            source,
            store,
            notifier,
            ledger: None,
        })
    }

    pub fn with_ledger(mut self, ledger: FailedDeliveryLog) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn streams(&self) -> &[StreamSpec] {
        &self.streams
    }

    /// Every configured stream, one after another.
    pub async fn run_all(&self) -> Vec<(StreamId, Result<RunReport, RunError>)> {
        let mut results = Vec::with_capacity(self.streams.len());
        for spec in &self.streams {
            results.push((spec.id.clone(), self.run_stream(spec).await));
        }
        results
    }

    pub async fn run_stream(&self, spec: &StreamSpec) -> Result<RunReport, RunError> {
        let run_id = RunId::new();
        let span = info_span!("run", run_id = %run_id, stream = %spec.id);
        self.run_inner(run_id, spec).instrument(span).await
    }

    async fn run_inner(&self, run_id: RunId, spec: &StreamSpec) -> Result<RunReport, RunError> {
        let mut current = self.source.fetch(spec).await?;
        let redelivery = self.redeliver(&spec.id).await;
        let previous = self.load_previous(&spec.id)?;

        let carried_over = match previous.as_ref() {
            Some(previous) => current.carry_over(previous),
            None => 0,
        };
        if carried_over > 0 {
            info!(carried_over, "kept previous values for unreadable cells");
        }

        let ctx = RenderContext::new(&spec.title, &current).with_bags(spec.pieces_per_bag);
        let mut evaluation = self.pipeline.evaluate(previous.as_ref(), &ctx)?;

        let mut balance = None;
        if !evaluation.events.is_empty() {
            balance = self.reconcile(spec, &current).await;
            if let Some(comparison) = balance.as_ref() {
                let ctx = ctx.with_balance(Some(comparison));
                evaluation.payloads = self.pipeline.render(&evaluation.events, &ctx);
            }
        }

        let delivery = self.deliver(&spec.id, &evaluation.payloads).await;

        self.store.save(&spec.id, &current)?;

        let report = RunReport {
            run_id,
            stream: spec.id.clone(),
            cold_start: evaluation.diff.cold_start,
            summary: evaluation.diff.summary(),
            events: evaluation.events.len(),
            carried_over,
            balance,
            redelivery,
            delivery,
        };

        if report.cold_start {
            info!(items = current.len(), "baseline saved");
        } else {
            info!(summary = %report.summary, events = report.events, delivery = ?report.delivery, "run complete");
        }
        Ok(report)
    }

    /// Undecodable state re-baselines; any other store failure aborts.
    fn load_previous(&self, stream: &StreamId) -> Result<Option<Snapshot>, RunError> {
        match self.store.load(stream) {
            Ok(previous) => Ok(previous),
            Err(err @ StoreError::Corrupt { .. }) => {
                warn!(error = %err, "discarding unreadable state; treating as cold start");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Compare the snapshot total with the records sheet. Failures only cost
    /// the section, never the run.
    async fn reconcile(&self, spec: &StreamSpec, current: &Snapshot) -> Option<BalanceComparison> {
        let check = spec.balance_check.as_ref()?;
        let period = current
            .taken_at()
            .with_timezone(&self.pipeline.utc_offset())
            .format("%Y-%m")
            .to_string();

        match self.source.fetch_balance(check, &period).await {
            Ok(records) => {
                if !records.exact_period {
                    warn!(wanted = %period, using = %records.period, "no records for current period; using latest");
                }
                Some(BalanceComparison::new(current.total(&check.exclude_keys), &records))
            }
            Err(e) => {
                warn!(error = %e, "balance check failed; omitting section");
                None
            }
        }
    }

    async fn deliver(&self, stream: &StreamId, payloads: &[MessagePayload]) -> DeliveryOutcome {
        if payloads.is_empty() {
            return DeliveryOutcome::Skipped;
        }

        for (sent, payload) in payloads.iter().enumerate() {
            if let Err(e) = self.notifier.send(payload).await {
                warn!(error = %e, sent, pending = payloads.len() - sent, "delivery failed; state will still be saved");
                self.record_failure(stream, &e.to_string(), &payloads[sent..]);
                return DeliveryOutcome::Failed {
                    sent,
                    error: e.to_string(),
                };
            }
        }

        DeliveryOutcome::Delivered {
            messages: payloads.len(),
        }
    }

    fn record_failure(&self, stream: &StreamId, error: &str, undelivered: &[MessagePayload]) {
        let Some(ledger) = self.ledger.as_ref() else {
            return;
        };
        let entry = FailedDelivery::new(stream.clone(), error, undelivered.to_vec());
        if let Err(e) = ledger.record(&entry) {
            warn!(error = %e, "could not record failed delivery");
        }
    }

    /// Send what earlier runs of this stream left undelivered, oldest first.
    ///
    /// Stops at the first failure so messages keep their order; the failing
    /// entry keeps its unsent tail and counts one more attempt. Entries of
    /// other streams are left as they are.
    async fn redeliver(&self, stream: &StreamId) -> Redelivery {
        let mut outcome = Redelivery::default();
        let Some(ledger) = self.ledger.as_ref() else {
            return outcome;
        };
        let entries = match ledger.list() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "cannot read failed-delivery ledger; skipping re-delivery");
                return outcome;
            }
        };
        if !entries.iter().any(|entry| &entry.stream == stream) {
            return outcome;
        }

        let mut kept = Vec::with_capacity(entries.len());
        let mut blocked = false;
        for mut entry in entries {
            if &entry.stream != stream || blocked {
                if &entry.stream == stream {
                    outcome.pending += 1;
                }
                kept.push(entry);
                continue;
            }

            let mut sent = 0;
            let mut failure = None;
            for payload in &entry.payloads {
                match self.notifier.send(payload).await {
                    Ok(()) => sent += 1,
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            outcome.delivered += sent;

            match failure {
                None => info!(messages = sent, attempts = entry.attempts + 1, "re-delivered failed messages"),
                Some(e) => {
                    warn!(error = %e, sent, attempts = entry.attempts + 1, "re-delivery failed");
                    let rest = entry.payloads.split_off(sent);
                    entry.retry_failed(e.to_string(), rest);
                    outcome.pending += 1;
                    blocked = true;
                    kept.push(entry);
                }
            }
        }

        if let Err(e) = ledger.replace(&kept) {
            warn!(error = %e, "could not update failed-delivery ledger");
        }
        outcome
    }
}
