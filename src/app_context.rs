//! Shared components wired from configuration.

use std::sync::Arc;

use action_locator::ProviderCatalog;
use action_primitives::ScreenshotHook;
use cdp_adapter::{ChromiumSessionFactory, SessionFactory};
use mailpilot_scheduler::{SchedulerService, TaskOrchestrator};
use tracing::info;

use crate::config::AppConfig;
use crate::errors::AppResult;
use crate::intent::{InstructionParser, KeywordInstructionParser};
use crate::screenshots::DirectoryScreenshotHook;

#[derive(Clone)]
pub struct AppContext {
    config: Arc<AppConfig>,
    catalog: Arc<ProviderCatalog>,
    parser: Arc<dyn InstructionParser>,
    orchestrator: Arc<TaskOrchestrator>,
    scheduler: Arc<SchedulerService>,
}

impl AppContext {
    pub fn new(config: AppConfig, sessions: Arc<dyn SessionFactory>) -> AppResult<Self> {
        let catalog = Arc::new(config.providers.catalog()?);
        let hook = screenshot_hook(&config);
        let orchestrator = Arc::new(
            TaskOrchestrator::new(
                Arc::clone(&catalog),
                sessions,
                config.automation.orchestrator_config(),
            )
            .with_screenshot_hook(hook),
        );
        let scheduler = Arc::new(SchedulerService::new(
            Arc::clone(&orchestrator),
            config.scheduler.scheduler_config(),
        ));
        info!(
            providers = ?catalog.known_providers(),
            workers = config.scheduler.workers,
            "application context ready"
        );
        Ok(Self {
            config: Arc::new(config),
            catalog,
            parser: Arc::new(KeywordInstructionParser::new()),
            orchestrator,
            scheduler,
        })
    }

    /// Context backed by real Chromium sessions.
    pub fn with_chromium(config: AppConfig) -> AppResult<Self> {
        let sessions = Arc::new(ChromiumSessionFactory::new(config.browser.driver_config()));
        Self::new(config, sessions)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<ProviderCatalog> {
        &self.catalog
    }

    pub fn parser(&self) -> &Arc<dyn InstructionParser> {
        &self.parser
    }

    pub fn orchestrator(&self) -> &Arc<TaskOrchestrator> {
        &self.orchestrator
    }

    pub fn scheduler(&self) -> &Arc<SchedulerService> {
        &self.scheduler
    }
}

fn screenshot_hook(config: &AppConfig) -> Option<Arc<dyn ScreenshotHook>> {
    config.artifacts.screenshot_dir.as_ref().map(|dir| {
        Arc::new(DirectoryScreenshotHook::new(dir.clone())) as Arc<dyn ScreenshotHook>
    })
}
