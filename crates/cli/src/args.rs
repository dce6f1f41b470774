use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use stockwatch_alerts::DEFAULT_EPSILON;
use stockwatch_observability::LogFormat;

#[derive(Parser, Debug)]
#[command(name = "stockwatch", version, about = "Poll inventory spreadsheets and post change alerts")]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Check every stream once (for cron).
    Run,
    /// Check every stream on a fixed interval until Ctrl-C.
    Watch {
        #[arg(long, default_value_t = 300)]
        interval_secs: u64,
    },
    /// Report messages that could not be delivered.
    FailedDeliveries {
        /// Where to write the readable summary.
        #[arg(long, default_value = "failed_deliveries_readable.txt")]
        output: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Chat webhook that receives alerts.
    #[arg(long, env = "SPACE_WEBHOOK_URL", hide_env_values = true)]
    pub webhook_url: Option<String>,

    /// Spreadsheet holding the tracked sheets.
    #[arg(long, env = "SPREADSHEET_ID")]
    pub spreadsheet_id: Option<String>,

    /// Spreadsheet holding the monthly inventory records (defaults to --spreadsheet-id).
    #[arg(long, env = "INVENTORY_SHEET_ID")]
    pub inventory_sheet_id: Option<String>,

    /// Service-account key file.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS", default_value = "service-account.json")]
    pub credentials: PathBuf,

    /// Directory for persisted snapshots and the failed-delivery ledger.
    #[arg(long, env = "STOCKWATCH_STATE_DIR", default_value = ".data")]
    pub state_dir: PathBuf,

    /// Fernet key; when set, snapshots and the failed-delivery ledger are
    /// stored encrypted.
    #[arg(long, env = "STATE_ENCRYPTION_KEY", hide_env_values = true)]
    pub state_encryption_key: Option<String>,

    /// JSON file replacing the built-in stream definitions.
    #[arg(long, env = "STOCKWATCH_STREAMS")]
    pub streams_file: Option<PathBuf>,

    /// Quantity deltas smaller than this count as unchanged.
    #[arg(long, default_value_t = DEFAULT_EPSILON)]
    pub epsilon: f64,

    /// Smallest quantity change worth reporting.
    #[arg(long, default_value_t = 0.0)]
    pub min_quantity_delta: f64,

    /// Do not report attribute-only changes.
    #[arg(long)]
    pub no_attribute_changes: bool,

    /// Do not report new or removed items.
    #[arg(long)]
    pub no_additions_removals: bool,

    /// Do not append the current levels section.
    #[arg(long)]
    pub no_current_levels: bool,

    #[arg(long, default_value_t = 4000)]
    pub max_payload_bytes: usize,

    /// Offset of the local time zone used for timestamps and record periods.
    #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
    pub utc_offset_hours: i32,

    #[arg(long, default_value = "WAT")]
    pub zone_label: String,

    #[arg(long, env = "STOCKWATCH_LOG_FORMAT", default_value = "json")]
    pub log_format: LogFormat,
}
