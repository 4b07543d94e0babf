use std::sync::Arc;

use verbatim_core::{
    ArtifactPublisher, Authenticator, Config, ProgressBus, SanitizedConfig, TaskDispatcher,
    TaskStore,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    task_store: Arc<dyn TaskStore>,
    dispatcher: Arc<TaskDispatcher>,
    progress_bus: Arc<ProgressBus>,
    publisher: Arc<dyn ArtifactPublisher>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        task_store: Arc<dyn TaskStore>,
        dispatcher: Arc<TaskDispatcher>,
        progress_bus: Arc<ProgressBus>,
        publisher: Arc<dyn ArtifactPublisher>,
    ) -> Self {
        Self {
            config,
            authenticator,
            task_store,
            dispatcher,
            progress_bus,
            publisher,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn task_store(&self) -> &dyn TaskStore {
        self.task_store.as_ref()
    }

    pub fn dispatcher(&self) -> &TaskDispatcher {
        self.dispatcher.as_ref()
    }

    pub fn progress_bus(&self) -> &ProgressBus {
        self.progress_bus.as_ref()
    }

    pub fn publisher(&self) -> &dyn ArtifactPublisher {
        self.publisher.as_ref()
    }
}
