use std::sync::Arc;

use storyforge_core::{Config, SanitizedConfig, Scheduler, TaskRegistry};

/// Shared application state
pub struct AppState {
    config: Config,
    registry: Arc<TaskRegistry>,
    scheduler: Scheduler,
}

impl AppState {
    pub fn new(config: Config, registry: Arc<TaskRegistry>, scheduler: Scheduler) -> Self {
        Self {
            config,
            registry,
            scheduler,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Get the task registry
    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Get the scheduler handle
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}
