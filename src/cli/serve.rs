use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;
use tracing::info;

use crate::app_context::AppContext;
use crate::config::AppConfig;
use crate::server::{build_router, ServeState};

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Address to listen on (defaults to server.bind)
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

pub async fn cmd_serve(args: ServeArgs, config: AppConfig) -> Result<()> {
    let addr: SocketAddr = match args.bind {
        Some(addr) => addr,
        None => config
            .server
            .bind
            .parse()
            .with_context(|| format!("Invalid server.bind address: {}", config.server.bind))?,
    };

    let context = AppContext::with_chromium(config)?;
    context.scheduler().start().await;
    let app = build_router(ServeState::new(context));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "MailPilot API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server exited with error")?;
    info!("MailPilot API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
