//! Progress event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{ArtifactDescriptor, Stage, Task, TaskFailure};

/// A point-in-time status/progress notification for a task.
///
/// Events are ephemeral: they are built from a task record that has already
/// been committed to the store, so a caller that polls right after seeing an
/// event never observes state older than the event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressEvent {
    pub task_id: String,
    /// State type string ("pending", "running", "completed", "failed").
    pub status: String,
    /// Stage currently executing, absent outside `running`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Overall progress (0.0-100.0).
    pub progress: f32,
    /// Optional human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failure payload, present iff status = "failed".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskFailure>,
    /// Result artifacts, present on the completed terminal event.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<ArtifactDescriptor>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    /// Build an event mirroring a committed task record.
    pub fn from_task(task: &Task, message: Option<String>) -> Self {
        Self {
            task_id: task.id.clone(),
            status: task.state.state_type().to_string(),
            stage: task.state.stage(),
            progress: task.state.progress(),
            message,
            error: task.state.failure().cloned(),
            artifacts: task.state.artifacts().to_vec(),
            timestamp: task.updated_at,
        }
    }

    /// Returns true if this event reflects a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status == "completed" || self.status == "failed"
    }
}
