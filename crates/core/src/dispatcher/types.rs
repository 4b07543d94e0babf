//! Types for the task dispatcher.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during dispatch.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Dispatcher is not running.
    #[error("dispatcher is not running")]
    NotRunning,

    /// Task not found.
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// Invalid task state for operation.
    #[error("cannot {operation} task {task_id}: current state is {current_state}")]
    InvalidState {
        task_id: String,
        current_state: String,
        operation: String,
    },

    /// Task store error.
    #[error("task store error: {0}")]
    Store(#[from] crate::task::TaskError),
}

/// Current status of the dispatcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatcherStatus {
    /// Whether the dispatcher is running.
    pub running: bool,
    /// Pipelines currently executing.
    pub active_tasks: usize,
    /// Tasks waiting for a slot.
    pub pending_count: usize,
    /// Tasks in running state according to the store.
    pub running_count: usize,
}
