use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::init_logging;
use crate::config::load_config;

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();
    let config = load_config(cli.config.as_deref())?;
    let _log_guard = init_logging(&cli.log_level, cli.log_format, config.logging.file.as_deref())?;

    info!("Starting MailPilot v{}", env!("CARGO_PKG_VERSION"));

    match dispatch(&cli, config).await {
        Ok(()) => Ok(()),
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
