//! Layered application configuration.
//!
//! Built-in defaults, then an optional YAML file, then `MAILPILOT__*`
//! environment variables (`MAILPILOT__SCHEDULER__WORKERS=4`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use action_flow::FlowTimings;
use action_locator::ProviderCatalog;
use cdp_adapter::DriverConfig;
use config::{Config, Environment, File, FileFormat};
use mailpilot_scheduler::{OrchestratorConfig, SchedulerConfig};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;

pub const ENV_PREFIX: &str = "MAILPILOT";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub browser: BrowserSettings,
    pub automation: AutomationSettings,
    pub scheduler: SchedulerSettings,
    pub providers: ProviderSettings,
    pub artifacts: ArtifactSettings,
    pub logging: LoggingSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    pub ws_push_interval_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            ws_push_interval_ms: 1_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        let driver = DriverConfig::default();
        Self {
            headless: true,
            chrome_path: None,
            user_data_dir: None,
            window_width: driver.window_width,
            window_height: driver.window_height,
            user_agent: None,
        }
    }
}

impl BrowserSettings {
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            executable: self.chrome_path.clone(),
            user_data_dir: self.user_data_dir.clone(),
            window_width: self.window_width,
            window_height: self.window_height,
            user_agent: self.user_agent.clone(),
            ..DriverConfig::default()
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationSettings {
    pub per_candidate_timeout_ms: u64,
    pub step_timeout_ms: u64,
    pub auth_wait_secs: u64,
    pub auth_poll_interval_ms: u64,
    pub post_navigate_settle_ms: u64,
    pub post_compose_delay_ms: u64,
    pub inter_field_delay_ms: u64,
    pub provider_settle_ms: u64,
    pub max_provider_attempts: u32,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        let timings = FlowTimings::default();
        let orchestrator = OrchestratorConfig::default();
        Self {
            per_candidate_timeout_ms: millis(timings.per_candidate_timeout),
            step_timeout_ms: millis(timings.step_timeout),
            auth_wait_secs: timings.auth_wait.as_secs(),
            auth_poll_interval_ms: millis(timings.auth_poll_interval),
            post_navigate_settle_ms: millis(timings.post_navigate_settle),
            post_compose_delay_ms: millis(timings.post_compose_delay),
            inter_field_delay_ms: millis(timings.inter_field_delay),
            provider_settle_ms: millis(orchestrator.provider_settle),
            max_provider_attempts: orchestrator.max_provider_attempts,
        }
    }
}

impl AutomationSettings {
    pub fn flow_timings(&self) -> FlowTimings {
        FlowTimings {
            per_candidate_timeout: Duration::from_millis(self.per_candidate_timeout_ms),
            step_timeout: Duration::from_millis(self.step_timeout_ms),
            auth_wait: Duration::from_secs(self.auth_wait_secs),
            auth_poll_interval: Duration::from_millis(self.auth_poll_interval_ms),
            post_navigate_settle: Duration::from_millis(self.post_navigate_settle_ms),
            post_compose_delay: Duration::from_millis(self.post_compose_delay_ms),
            inter_field_delay: Duration::from_millis(self.inter_field_delay_ms),
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            timings: self.flow_timings(),
            provider_settle: Duration::from_millis(self.provider_settle_ms),
            max_provider_attempts: self.max_provider_attempts.max(1),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        let defaults = SchedulerConfig::default();
        Self {
            workers: defaults.workers,
            queue_capacity: defaults.queue_capacity,
        }
    }
}

impl SchedulerSettings {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            workers: self.workers.max(1),
            queue_capacity: self.queue_capacity.max(1),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// YAML file of provider profiles merged over the built-in ones.
    pub file: Option<PathBuf>,
}

impl ProviderSettings {
    pub fn catalog(&self) -> Result<ProviderCatalog, AppError> {
        let mut catalog = ProviderCatalog::builtin();
        if let Some(path) = &self.file {
            let merged = catalog.load_overrides(path)?;
            info!(path = %path.display(), merged, "loaded provider profiles");
        }
        Ok(catalog)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactSettings {
    /// Failure screenshots land here; `None` disables capture.
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            screenshot_dir: Some(PathBuf::from("artifacts/screenshots")),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Daily-rotated log file written alongside stderr output.
    pub file: Option<PathBuf>,
}

/// `./config/config.yaml` wins over `<config_dir>/mailpilot/config.yaml`.
pub fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from("config/config.yaml");
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir().map(|dir| dir.join("mailpilot").join("config.yaml"))
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig, AppError> {
    let resolved = match path {
        Some(path) => {
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            Some(path.to_path_buf())
        }
        None => default_config_path(),
    };

    let mut builder = Config::builder();
    match &resolved {
        Some(path) if path.exists() => {
            info!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Yaml));
        }
        Some(path) => {
            warn!(path = %path.display(), "config file not found, using defaults");
        }
        None => {}
    }
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    builder
        .build()
        .and_then(|config| config.try_deserialize::<AppConfig>())
        .map_err(|err| AppError::Config(err.to_string()))
}
