//! Task records, state machine and storage.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteTaskStore;
pub use store::{CreateTaskRequest, TaskError, TaskFilter, TaskStore};
pub use types::{
    ArtifactDescriptor, FailureKind, OutputFormat, Stage, Task, TaskFailure, TaskInput, TaskState,
};
