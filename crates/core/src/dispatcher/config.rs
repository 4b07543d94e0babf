//! Dispatcher configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the task dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Maximum pipelines executing concurrently.
    /// Queued tasks wait for a free slot in arrival order.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_tasks: usize,

    /// Grace period given to in-flight work on shutdown (milliseconds).
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_ms: u64,
}

fn default_max_concurrent() -> usize {
    2
}

fn default_shutdown_grace() -> u64 {
    500
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: default_max_concurrent(),
            shutdown_grace_ms: default_shutdown_grace(),
        }
    }
}
