use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};

use stockwatch_infra::notify::render_summary;
use stockwatch_infra::sheets::ServiceAccountKey;
use stockwatch_infra::{
    FailedDeliveryLog, FileSnapshotStore, Orchestrator, SheetsClient, SheetsSnapshotSource, StateCipher,
    TokenProvider, WatchConfig, WebhookNotifier, watch,
};

use crate::config::AppConfig;

type LiveOrchestrator = Orchestrator<SheetsSnapshotSource<SheetsClient>, FileSnapshotStore, WebhookNotifier>;

fn build(config: &AppConfig) -> Result<LiveOrchestrator> {
    let key = ServiceAccountKey::from_file(&config.credentials).context("load service account credentials")?;
    let client = SheetsClient::new(TokenProvider::service_account(key)).context("build sheets client")?;
    let notifier = WebhookNotifier::new(config.webhook_url.clone()).context("build webhook notifier")?;

    let mut store = FileSnapshotStore::new(&config.state_dir);
    if let Some(cipher) = &config.cipher {
        store = store.with_cipher(cipher.clone());
    }

    let orchestrator = Orchestrator::new(
        config.streams.clone(),
        &config.pipeline,
        SheetsSnapshotSource::new(client),
        store,
        notifier,
    )
    .context("invalid alerting configuration")?
    .with_ledger(ledger(&config.state_dir, config.cipher.as_ref()));

    Ok(orchestrator)
}

fn ledger(state_dir: &Path, cipher: Option<&StateCipher>) -> FailedDeliveryLog {
    match cipher {
        Some(cipher) => FailedDeliveryLog::encrypted_in_dir(state_dir, cipher.clone()),
        None => FailedDeliveryLog::in_dir(state_dir),
    }
}

/// One pass over every stream. Fails the process if any stream failed or any
/// message went undelivered.
pub async fn run(config: &AppConfig) -> Result<ExitCode> {
    let orchestrator = build(config)?;

    let mut failed = false;
    for (stream, result) in orchestrator.run_all().await {
        match result {
            Ok(report) => failed |= report.delivery_failed(),
            Err(e) => {
                error!(stream = %stream, error = %e, "run failed");
                failed = true;
            }
        }
    }

    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// Poll until Ctrl-C.
pub async fn watch_until_interrupted(config: &AppConfig, interval_secs: u64) -> Result<ExitCode> {
    anyhow::ensure!(interval_secs > 0, "--interval-secs must be greater than zero");
    let orchestrator = build(config)?;

    let cfg = WatchConfig {
        interval: Duration::from_secs(interval_secs),
        ..WatchConfig::default()
    };
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for ctrl-c; stopping");
        }
        info!("shutdown requested; finishing current run");
    };

    watch(&orchestrator, &cfg, shutdown).await;
    Ok(ExitCode::SUCCESS)
}

/// Print `NONE`, `FOUND:{n}` or `ERROR:{reason}`; on findings write the
/// readable summary to `output`.
///
/// An encrypted ledger without a key is an error, not "none".
pub fn failed_deliveries(state_dir: &Path, cipher: Option<&StateCipher>, output: &Path) -> Result<ExitCode> {
    if cipher.is_none() && state_dir.join(FailedDeliveryLog::ENCRYPTED_FILE_NAME).exists() {
        println!("ERROR:STATE_ENCRYPTION_KEY not set");
        return Ok(ExitCode::FAILURE);
    }

    let entries = match ledger(state_dir, cipher).list() {
        Ok(entries) => entries,
        Err(e) => {
            println!("ERROR:{e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    if entries.is_empty() {
        println!("NONE");
        return Ok(ExitCode::SUCCESS);
    }

    std::fs::write(output, render_summary(&entries))
        .with_context(|| format!("write {}", output.display()))?;
    println!("FOUND:{}", entries.len());
    Ok(ExitCode::SUCCESS)
}
