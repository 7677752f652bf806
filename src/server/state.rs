use std::sync::Arc;

use chrono::{DateTime, Utc};
use mailpilot_scheduler::SchedulerService;

use crate::app_context::AppContext;

#[derive(Clone)]
pub struct ServeState {
    pub(crate) context: AppContext,
    pub(crate) started_at: DateTime<Utc>,
}

impl ServeState {
    pub fn new(context: AppContext) -> Self {
        Self {
            context,
            started_at: Utc::now(),
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub(crate) fn scheduler(&self) -> &Arc<SchedulerService> {
        self.context.scheduler()
    }
}
