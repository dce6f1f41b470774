//! Resolved runtime configuration, built once from the command line and
//! environment and handed to the orchestrator.

use std::path::PathBuf;

use thiserror::Error;

use stockwatch_alerts::{ClassifierConfig, FormatterConfig, PipelineConfig};
use stockwatch_infra::{
    CipherError, StateCipher, StreamConfigError, StreamSpec, builtin_streams, load_streams_file, resolve_streams,
};

use crate::args::CommonArgs;

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("SPACE_WEBHOOK_URL is not set")]
    MissingWebhook,

    #[error("utc offset of {0} hours is out of range")]
    InvalidUtcOffset(i32),

    #[error("STATE_ENCRYPTION_KEY is invalid: {0}")]
    InvalidEncryptionKey(#[from] CipherError),

    #[error(transparent)]
    Streams(#[from] StreamConfigError),
}

/// The configured state cipher, if any. A blank key counts as unset.
pub fn state_cipher(args: &CommonArgs) -> Result<Option<StateCipher>, AppConfigError> {
    args.state_encryption_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .map(StateCipher::from_key)
        .transpose()
        .map_err(AppConfigError::from)
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub webhook_url: String,
    pub credentials: PathBuf,
    pub state_dir: PathBuf,
    pub cipher: Option<StateCipher>,
    pub streams: Vec<StreamSpec>,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn from_args(args: &CommonArgs) -> Result<Self, AppConfigError> {
        let webhook_url = args
            .webhook_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or(AppConfigError::MissingWebhook)?;

        let streams = match &args.streams_file {
            Some(path) => load_streams_file(path)?,
            None => builtin_streams(),
        };
        let streams = resolve_streams(
            streams,
            args.spreadsheet_id.as_deref(),
            args.inventory_sheet_id.as_deref(),
        )?;

        Ok(Self {
            webhook_url,
            credentials: args.credentials.clone(),
            state_dir: args.state_dir.clone(),
            cipher: state_cipher(args)?,
            streams,
            pipeline: pipeline_config(args)?,
        })
    }
}

fn pipeline_config(args: &CommonArgs) -> Result<PipelineConfig, AppConfigError> {
    if !(-23..=23).contains(&args.utc_offset_hours) {
        return Err(AppConfigError::InvalidUtcOffset(args.utc_offset_hours));
    }

    Ok(PipelineConfig {
        epsilon: args.epsilon,
        classifier: ClassifierConfig {
            min_quantity_delta_to_report: args.min_quantity_delta,
            report_attribute_changes: !args.no_attribute_changes,
            report_additions_removals: !args.no_additions_removals,
        },
        formatter: FormatterConfig {
            max_payload_bytes: args.max_payload_bytes,
            include_current_levels: !args.no_current_levels,
            utc_offset_seconds: args.utc_offset_hours * 3600,
            zone_label: args.zone_label.clone(),
        },
    })
}
