use std::process::ExitCode;

use clap::Parser;

use stockwatch_cli::args::{Cli, Command};
use stockwatch_cli::commands;
use stockwatch_cli::config::{AppConfig, state_cipher};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    stockwatch_observability::init(cli.common.log_format);

    match cli.command {
        Command::FailedDeliveries { output } => match state_cipher(&cli.common) {
            Ok(cipher) => commands::failed_deliveries(&cli.common.state_dir, cipher.as_ref(), &output),
            Err(e) => {
                println!("ERROR:{e}");
                Ok(ExitCode::FAILURE)
            }
        },
        Command::Run => {
            let config = AppConfig::from_args(&cli.common)?;
            tracing::info!(streams = config.streams.len(), state_dir = %config.state_dir.display(), "starting run");
            commands::run(&config).await
        }
        Command::Watch { interval_secs } => {
            let config = AppConfig::from_args(&cli.common)?;
            commands::watch_until_interrupted(&config, interval_secs).await
        }
    }
}
