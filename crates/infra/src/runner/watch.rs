use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::notify::Notifier;
use crate::sheets::SnapshotSource;
use crate::store::SnapshotStore;

use super::orchestrator::{Orchestrator, RunError};

/// Config for the polling loop.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub interval: Duration,
    /// Extra attempts for a stream whose fetch failed within one tick.
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            max_retries: 3,
            base_backoff: Duration::from_millis(500),
        }
    }
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    pub ticks: u64,
    pub failed_runs: u64,
    pub failed_deliveries: u64,
}

/// Run every stream once per interval until `shutdown` resolves.
///
/// - Schedule: first tick immediately, then a stable cadence; ticks missed
///   while a run was in flight are skipped, not queued
/// - Runs never overlap: shutdown is observed between ticks and during retry
///   backoff, never in the middle of a run
/// - Fetch failures: retried with bounded exponential backoff inside the tick
pub async fn watch<S, T, N, F>(orchestrator: &Orchestrator<S, T, N>, cfg: &WatchConfig, shutdown: F) -> WatchStats
where
    S: SnapshotSource,
    T: SnapshotStore,
    N: Notifier,
    F: Future<Output = ()>,
{
    info!(interval_secs = cfg.interval.as_secs_f64(), streams = orchestrator.streams().len(), "watch started");

    let mut ticker = tokio::time::interval(cfg.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut stats = WatchStats::default();
    'ticks: loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        stats.ticks += 1;
        let started = Instant::now();
        for spec in orchestrator.streams() {
            let mut attempt = 0u32;
            let result = loop {
                match orchestrator.run_stream(spec).await {
                    Err(RunError::Fetch(e)) if attempt < cfg.max_retries => {
                        attempt += 1;
                        let wait = backoff(cfg.base_backoff, attempt);
                        warn!(stream = %spec.id, error = %e, attempt, wait_ms = wait.as_millis() as u64, "fetch failed; retrying");
                        tokio::select! {
                            biased;
                            _ = &mut shutdown => {
                                info!(stream = %spec.id, "shutdown requested during retry backoff");
                                break 'ticks;
                            }
                            _ = tokio::time::sleep(wait) => {}
                        }
                    }
                    other => break other,
                }
            };

            match result {
                Ok(report) if report.delivery_failed() => stats.failed_deliveries += 1,
                Ok(_) => {}
                Err(e) => {
                    stats.failed_runs += 1;
                    error!(stream = %spec.id, error = %e, "run failed");
                }
            }
        }

        let elapsed = started.elapsed();
        if elapsed > cfg.interval {
            warn!(elapsed_ms = elapsed.as_millis() as u64, "run took longer than the interval; skipping missed ticks");
        }
    }

    info!(ticks = stats.ticks, failed_runs = stats.failed_runs, failed_deliveries = stats.failed_deliveries, "watch stopped");
    stats
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    // base * 2^(attempt-1), capped at 30s.
    let pow = 1u32 << attempt.saturating_sub(1).min(10);
    let ms = base.as_millis().saturating_mul(pow as u128);
    Duration::from_millis(ms.min(30_000) as u64)
}
