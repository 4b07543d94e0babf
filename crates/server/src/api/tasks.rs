//! Task API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use verbatim_core::{
    CreateTaskRequest, DispatcherError, OutputFormat, SourceKind, Stage, Task, TaskFailure,
    TaskFilter, TaskInput,
};

use super::middleware::AuthUser;
use crate::state::AppState;

/// Maximum allowed limit for task queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for task queries
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a task
#[derive(Debug, Deserialize)]
pub struct CreateTaskBody {
    /// Remote media URL to transcribe
    pub source_url: String,
    /// Source kind hint ("url" | "youtube"); auto-detected when absent
    pub source_kind: Option<SourceKind>,
    /// Model name (default from config)
    pub model: Option<String>,
    /// Language hint (ISO 639-1 code)
    pub language: Option<String>,
    /// Output format ("text" | "markdown")
    pub output_format: Option<OutputFormat>,
    /// Inference device preference
    pub device: Option<String>,
    /// Compute precision preference
    pub compute_type: Option<String>,
}

/// Query parameters for listing tasks
#[derive(Debug, Deserialize)]
pub struct ListTasksParams {
    /// Filter by state type
    pub state: Option<String>,
    /// Filter by creator
    pub created_by: Option<String>,
    /// Maximum number of tasks to return
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

/// Response for a single artifact
#[derive(Debug, Serialize)]
pub struct ArtifactResponse {
    pub file_name: String,
    pub location: String,
    /// Resolved, caller-usable URL or path
    pub url: String,
    pub size_bytes: u64,
    pub detected_language: Option<String>,
    pub format: OutputFormat,
}

/// Response for task operations
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    pub progress: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskFailure>,
    pub artifacts: Vec<ArtifactResponse>,
    pub source_url: String,
    pub output_format: OutputFormat,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskResponse {
    fn from_task(task: Task, state: &AppState) -> Self {
        let artifacts = task
            .state
            .artifacts()
            .iter()
            .map(|a| ArtifactResponse {
                file_name: a.file_name.clone(),
                location: a.location.clone(),
                url: state.publisher().resolve_location(&a.location),
                size_bytes: a.size_bytes,
                detected_language: a.detected_language.clone(),
                format: a.format,
            })
            .collect();

        Self {
            id: task.id,
            status: task.state.state_type().to_string(),
            stage: task.state.stage(),
            progress: task.state.progress(),
            error: task.state.failure().cloned(),
            artifacts,
            source_url: task.input.source_url,
            output_format: task.input.output_format,
            created_by: task.created_by,
            created_at: task.created_at.to_rfc3339(),
            updated_at: task.updated_at.to_rfc3339(),
        }
    }
}

/// Response for listing tasks
#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    pub tasks: Vec<TaskResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct TaskErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<TaskErrorResponse>) {
    (
        status,
        Json(TaskErrorResponse {
            error: message.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a new task and enqueue it for execution
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateTaskBody>,
) -> Result<(StatusCode, Json<TaskResponse>), impl IntoResponse> {
    if !body.source_url.starts_with("http://") && !body.source_url.starts_with("https://") {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("source_url must be an http(s) URL: {}", body.source_url),
        ));
    }

    let input = TaskInput {
        source_url: body.source_url,
        source_kind: body.source_kind,
        model: body.model,
        language: body.language,
        output_format: body.output_format.unwrap_or_default(),
        device: body.device,
        compute_type: body.compute_type,
    };

    let task = state
        .task_store()
        .create(CreateTaskRequest {
            created_by: user_id,
            input,
        })
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    // The record exists either way; submission failure surfaces to the caller
    if let Err(e) = state.dispatcher().submit(&task.id) {
        return Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to enqueue task: {}", e),
        ));
    }

    Ok((
        StatusCode::CREATED,
        Json(TaskResponse::from_task(task, &state)),
    ))
}

/// Get a task by ID
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, impl IntoResponse> {
    match state.task_store().get(&id) {
        Ok(Some(task)) => Ok(Json(TaskResponse::from_task(task, &state))),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Task not found: {}", id),
        )),
        Err(e) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.to_string(),
        )),
    }
}

/// List tasks with optional filters
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTasksParams>,
) -> Result<Json<ListTasksResponse>, impl IntoResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = TaskFilter::new().with_limit(limit).with_offset(offset);

    if let Some(ref state_filter) = params.state {
        filter = filter.with_state(state_filter);
    }

    if let Some(ref created_by) = params.created_by {
        filter = filter.with_created_by(created_by);
    }

    let tasks = state
        .task_store()
        .list(&filter)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    // Get total count (without pagination)
    let count_filter = TaskFilter {
        limit: i64::MAX,
        offset: 0,
        ..filter.clone()
    };

    let total = state
        .task_store()
        .count(&count_filter)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok::<_, (StatusCode, Json<TaskErrorResponse>)>(Json(ListTasksResponse {
        tasks: tasks
            .into_iter()
            .map(|t| TaskResponse::from_task(t, &state))
            .collect(),
        total,
        limit,
        offset,
    }))
}

/// Request cancellation of a task (DELETE endpoint)
pub async fn cancel_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, impl IntoResponse> {
    match state.dispatcher().cancel(&id).await {
        Ok(()) => match state.task_store().get(&id) {
            Ok(Some(task)) => Ok(Json(TaskResponse::from_task(task, &state))),
            Ok(None) => Err(error_response(
                StatusCode::NOT_FOUND,
                format!("Task not found: {}", id),
            )),
            Err(e) => Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
            )),
        },
        Err(DispatcherError::TaskNotFound(_)) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Task not found: {}", id),
        )),
        Err(DispatcherError::InvalidState {
            current_state,
            operation,
            ..
        }) => Err(error_response(
            StatusCode::CONFLICT,
            format!(
                "Cannot {} task: current state is {}",
                operation, current_state
            ),
        )),
        Err(e) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.to_string(),
        )),
    }
}

/// Get the most recent artifact of a completed task
pub async fn get_artifact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ArtifactResponse>, impl IntoResponse> {
    let task = match state.task_store().get(&id) {
        Ok(Some(task)) => task,
        Ok(None) => {
            return Err(error_response(
                StatusCode::NOT_FOUND,
                format!("Task not found: {}", id),
            ));
        }
        Err(e) => {
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
            ));
        }
    };

    match task.state.artifacts().last() {
        Some(artifact) => Ok(Json(ArtifactResponse {
            file_name: artifact.file_name.clone(),
            location: artifact.location.clone(),
            url: state.publisher().resolve_location(&artifact.location),
            size_bytes: artifact.size_bytes,
            detected_language: artifact.detected_language.clone(),
            format: artifact.format,
        })),
        None => Err(error_response(
            StatusCode::CONFLICT,
            format!(
                "Task {} has no artifact yet (status: {})",
                id,
                task.state.state_type()
            ),
        )),
    }
}
