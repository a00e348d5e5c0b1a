use std::sync::Arc;
use weaver_core::{Config, JobOrchestrator};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<JobOrchestrator>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Arc<JobOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &Arc<JobOrchestrator> {
        &self.orchestrator
    }
}
