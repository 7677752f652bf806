use anyhow::Result;

use super::commands::Commands;
use super::env::CliArgs;
use super::info::cmd_info;
use super::parse::cmd_parse;
use super::providers::cmd_providers;
use super::send::cmd_send;
use super::serve::cmd_serve;
use crate::config::AppConfig;

pub async fn dispatch(cli: &CliArgs, config: AppConfig) -> Result<()> {
    match cli.command.clone() {
        Commands::Send(args) => cmd_send(args, config, cli.output).await,
        Commands::Serve(args) => cmd_serve(args, config).await,
        Commands::Parse(args) => cmd_parse(args, cli.output),
        Commands::Providers => cmd_providers(&config, cli.output),
        Commands::Info => cmd_info(&config, cli.config.as_deref(), cli.output),
    }
}
