//! Task storage trait and types.

use std::fmt;

use crate::task::{Task, TaskInput, TaskState};

/// Error type for task operations.
#[derive(Debug)]
pub enum TaskError {
    /// Task not found.
    NotFound(String),
    /// Cannot perform the transition from the current state.
    InvalidTransition {
        task_id: String,
        current_state: String,
        requested: String,
    },
    /// Database error.
    Database(String),
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::NotFound(id) => write!(f, "Task not found: {}", id),
            TaskError::InvalidTransition {
                task_id,
                current_state,
                requested,
            } => write!(
                f,
                "Cannot transition task {} from {} to {}",
                task_id, current_state, requested
            ),
            TaskError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for TaskError {}

/// Request to create a new task.
#[derive(Debug, Clone)]
pub struct CreateTaskRequest {
    /// User creating the task.
    pub created_by: String,
    /// Transcription request input.
    pub input: TaskInput,
}

/// Filter for querying tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Filter by state type.
    pub state: Option<String>,
    /// Filter by creator.
    pub created_by: Option<String>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl TaskFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            state: None,
            created_by: None,
            limit: 100,
            offset: 0,
        }
    }

    /// Filter by state type.
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Filter by creator.
    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }

    /// Set limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Set offset.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for task storage backends.
///
/// `update_state` is the single source of truth for transitions: it is
/// atomic per task id, refuses to leave terminal states, and returns the
/// authoritative post-update record.
pub trait TaskStore: Send + Sync {
    /// Create a new task in the `Pending` state.
    fn create(&self, request: CreateTaskRequest) -> Result<Task, TaskError>;

    /// Get a task by ID.
    fn get(&self, id: &str) -> Result<Option<Task>, TaskError>;

    /// List tasks matching the filter, oldest first.
    fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, TaskError>;

    /// Count tasks matching the filter.
    fn count(&self, filter: &TaskFilter) -> Result<i64, TaskError>;

    /// Update a task's state atomically together with `updated_at`.
    fn update_state(&self, id: &str, new_state: TaskState) -> Result<Task, TaskError>;

    /// Permanently delete a task. Returns the deleted task if found.
    fn delete(&self, id: &str) -> Result<Task, TaskError>;
}
