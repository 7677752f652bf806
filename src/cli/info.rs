use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use super::output::{emit, OutputFormat};
use crate::config::{default_config_path, AppConfig};

#[derive(Debug, Serialize)]
struct BuildInfo {
    version: &'static str,
    build_date: &'static str,
    git_hash: &'static str,
    git_branch: &'static str,
    config_path: Option<String>,
    chrome_executable: Option<String>,
    providers: Vec<String>,
    workers: usize,
    bind: String,
}

pub fn cmd_info(
    config: &AppConfig,
    config_path: Option<&Path>,
    output: OutputFormat,
) -> Result<()> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .or_else(default_config_path)
        .filter(|path| path.exists())
        .map(|path| path.display().to_string());
    let chrome_executable = config
        .browser
        .driver_config()
        .resolve_executable()
        .map(|path| path.display().to_string());
    let info = BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        build_date: env!("BUILD_DATE"),
        git_hash: env!("GIT_HASH"),
        git_branch: env!("GIT_BRANCH"),
        config_path,
        chrome_executable,
        providers: config.providers.catalog()?.known_providers(),
        workers: config.scheduler.workers,
        bind: config.server.bind.clone(),
    };

    emit(output, &info, || {
        format!(
            "MailPilot {}\n  built:     {} ({}@{})\n  config:    {}\n  chrome:    {}\n  \
             providers: {}\n  workers:   {}\n  bind:      {}",
            info.version,
            info.build_date,
            info.git_hash,
            info.git_branch,
            info.config_path.as_deref().unwrap_or("(defaults)"),
            info.chrome_executable.as_deref().unwrap_or("not found"),
            info.providers.join(", "),
            info.workers,
            info.bind,
        )
    })
}
