//! Core task data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fetcher::SourceKind;

// ============================================================================
// Input Types
// ============================================================================

/// Output format for the rendered transcript.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Plain text transcript.
    #[default]
    Text,
    /// Markdown transcript with a heading.
    Markdown,
}

impl OutputFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Markdown => "md",
        }
    }

    /// Returns the format as a string (for filtering and responses).
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Markdown => "markdown",
        }
    }
}

/// Immutable input for a transcription task.
///
/// Model, device and compute type are optional; the pipeline falls back to
/// the configured transcriber defaults when they are absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskInput {
    /// Remote media URL to transcribe.
    pub source_url: String,

    /// Source kind hint. When absent the fetcher classifies the URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_kind: Option<SourceKind>,

    /// Requested model name (e.g. "tiny", "base").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Language hint (ISO 639-1 code). None = auto-detect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Output format for the rendered transcript.
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Inference device preference (e.g. "cpu", "cuda").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// Compute precision preference (e.g. "int8", "float16").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_type: Option<String>,
}

impl TaskInput {
    /// Create a minimal input for the given URL.
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            source_kind: None,
            model: None,
            language: None,
            output_format: OutputFormat::default(),
            device: None,
            compute_type: None,
        }
    }

    /// Set the output format.
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the language hint.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

// ============================================================================
// Pipeline Stage
// ============================================================================

/// A stage of the transcription pipeline.
///
/// Stages always run in declaration order. Each stage owns a fixed progress
/// window so that polling callers observe forward-only progress regardless
/// of which stage is executing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Download the remote media into the working directory.
    Fetch,
    /// Extract/transcode audio to the fixed sample format.
    Extract,
    /// Run speech-to-text inference.
    Transcribe,
    /// Render the transcript into the requested output format.
    Render,
    /// Upload the rendered artifact to storage.
    Publish,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 5] = [
        Stage::Fetch,
        Stage::Extract,
        Stage::Transcribe,
        Stage::Render,
        Stage::Publish,
    ];

    /// Progress value at which this stage begins (0.0-100.0).
    pub fn start_progress(&self) -> f32 {
        match self {
            Stage::Fetch => 0.0,
            Stage::Extract => 25.0,
            Stage::Transcribe => 40.0,
            Stage::Render => 90.0,
            Stage::Publish => 95.0,
        }
    }

    /// Progress value reached once this stage completes.
    pub fn end_progress(&self) -> f32 {
        match self {
            Stage::Fetch => 25.0,
            Stage::Extract => 40.0,
            Stage::Transcribe => 90.0,
            Stage::Render => 95.0,
            Stage::Publish => 100.0,
        }
    }

    /// Returns the stage name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Transcribe => "transcribe",
            Stage::Render => "render",
            Stage::Publish => "publish",
        }
    }

    /// Failure kind attributed to errors in this stage.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Stage::Fetch => FailureKind::Fetch,
            Stage::Extract => FailureKind::Extract,
            Stage::Transcribe => FailureKind::Transcribe,
            Stage::Render => FailureKind::Render,
            Stage::Publish => FailureKind::Publish,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Failure Types
// ============================================================================

/// Category of a task failure, identifying the failing stage or condition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Fetch,
    Extract,
    Transcribe,
    Render,
    Publish,
    /// Cooperative cancellation requested from outside the executor.
    Cancelled,
    /// Process restarted while the task was running; no executor survived.
    Interrupted,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Fetch => "fetch",
            FailureKind::Extract => "extract",
            FailureKind::Transcribe => "transcribe",
            FailureKind::Render => "render",
            FailureKind::Publish => "publish",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Interrupted => "interrupted",
            FailureKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure surfaced to callers. No stack traces cross this
/// boundary; adapters reduce their errors to a kind and a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TaskFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "task cancelled")
    }
}

// ============================================================================
// Artifacts
// ============================================================================

/// Descriptor of one output artifact produced by a completed task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactDescriptor {
    /// Output file name (e.g. "transcript.txt").
    pub file_name: String,
    /// Storage location (object key or path, resolvable to a URL).
    pub location: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Language detected by the transcriber, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<String>,
    /// Content format of the artifact.
    pub format: OutputFormat,
}

// ============================================================================
// State Machine
// ============================================================================

/// Current state of a task.
///
/// State machine flow:
/// ```text
/// Pending -> Running -> Completed
///               |
///               v
///            Failed   (fatal stage error, cancellation, or interruption)
/// ```
///
/// `Completed` and `Failed` are terminal and immutable; the store rejects
/// any transition out of them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskState {
    /// Task created, waiting for a free executor slot.
    Pending,

    /// An executor is driving the pipeline.
    Running {
        /// Stage currently executing.
        stage: Stage,
        /// Overall progress (0.0-100.0, monotonically non-decreasing).
        progress: f32,
        started_at: DateTime<Utc>,
    },

    /// Task completed successfully (terminal).
    Completed {
        /// Output artifacts in production order.
        artifacts: Vec<ArtifactDescriptor>,
        completed_at: DateTime<Utc>,
    },

    /// Task failed (terminal).
    Failed {
        error: TaskFailure,
        /// Progress reached when the failure occurred.
        progress: f32,
        failed_at: DateTime<Utc>,
    },
}

impl TaskState {
    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed { .. } | TaskState::Failed { .. }
        )
    }

    /// Returns true if the task can be cancelled from this state.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// Overall progress value for this state (0.0-100.0).
    pub fn progress(&self) -> f32 {
        match self {
            TaskState::Pending => 0.0,
            TaskState::Running { progress, .. } => *progress,
            TaskState::Completed { .. } => 100.0,
            TaskState::Failed { progress, .. } => *progress,
        }
    }

    /// Name of the stage currently executing, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            TaskState::Running { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Artifacts produced by the task. Empty until completed.
    pub fn artifacts(&self) -> &[ArtifactDescriptor] {
        match self {
            TaskState::Completed { artifacts, .. } => artifacts,
            _ => &[],
        }
    }

    /// Failure payload, present iff the task failed.
    pub fn failure(&self) -> Option<&TaskFailure> {
        match self {
            TaskState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Returns the state type as a string (for filtering).
    pub fn state_type(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running { .. } => "running",
            TaskState::Completed { .. } => "completed",
            TaskState::Failed { .. } => "failed",
        }
    }
}

/// A task representing one transcription request and its lifecycle record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Unique identifier (UUID).
    pub id: String,

    /// When the task was created.
    pub created_at: DateTime<Utc>,

    /// User who created the task (from auth identity).
    pub created_by: String,

    /// Immutable request input.
    pub input: TaskInput,

    /// Current state.
    pub state: TaskState,

    /// Last update timestamp. Written atomically with `state`.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_state_is_not_terminal() {
        let state = TaskState::Pending;
        assert!(!state.is_terminal());
        assert!(state.can_cancel());
        assert_eq!(state.progress(), 0.0);
        assert!(state.stage().is_none());
    }

    #[test]
    fn test_running_state() {
        let state = TaskState::Running {
            stage: Stage::Transcribe,
            progress: 40.0,
            started_at: Utc::now(),
        };
        assert!(!state.is_terminal());
        assert!(state.can_cancel());
        assert_eq!(state.stage(), Some(Stage::Transcribe));
        assert_eq!(state.progress(), 40.0);
        assert_eq!(state.state_type(), "running");
    }

    #[test]
    fn test_completed_state_is_terminal() {
        let state = TaskState::Completed {
            artifacts: vec![ArtifactDescriptor {
                file_name: "transcript.txt".to_string(),
                location: "transcripts/abc/transcript.txt".to_string(),
                size_bytes: 1024,
                detected_language: Some("en".to_string()),
                format: OutputFormat::Text,
            }],
            completed_at: Utc::now(),
        };
        assert!(state.is_terminal());
        assert!(!state.can_cancel());
        assert_eq!(state.progress(), 100.0);
        assert_eq!(state.artifacts().len(), 1);
        assert_eq!(state.state_type(), "completed");
    }

    #[test]
    fn test_failed_state_carries_error() {
        let state = TaskState::Failed {
            error: TaskFailure::new(FailureKind::Fetch, "connection refused"),
            progress: 0.0,
            failed_at: Utc::now(),
        };
        assert!(state.is_terminal());
        assert_eq!(state.failure().unwrap().kind, FailureKind::Fetch);
        assert!(state.artifacts().is_empty());
        assert_eq!(state.state_type(), "failed");
    }

    #[test]
    fn test_error_present_iff_failed() {
        assert!(TaskState::Pending.failure().is_none());
        let running = TaskState::Running {
            stage: Stage::Fetch,
            progress: 0.0,
            started_at: Utc::now(),
        };
        assert!(running.failure().is_none());
        let completed = TaskState::Completed {
            artifacts: vec![],
            completed_at: Utc::now(),
        };
        assert!(completed.failure().is_none());
    }

    #[test]
    fn test_stage_order_and_progress_windows() {
        let mut prev_end = 0.0;
        for stage in Stage::ALL {
            assert_eq!(stage.start_progress(), prev_end);
            assert!(stage.end_progress() > stage.start_progress());
            prev_end = stage.end_progress();
        }
        assert_eq!(prev_end, 100.0);
    }

    #[test]
    fn test_stage_failure_kinds() {
        assert_eq!(Stage::Fetch.failure_kind(), FailureKind::Fetch);
        assert_eq!(Stage::Publish.failure_kind(), FailureKind::Publish);
    }

    #[test]
    fn test_task_state_serialization() {
        let state = TaskState::Pending;
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"type":"pending"}"#);

        let deserialized: TaskState = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, state);
    }

    #[test]
    fn test_running_state_serialization() {
        let state = TaskState::Running {
            stage: Stage::Extract,
            progress: 25.0,
            started_at: Utc::now(),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"type\":\"running\""));
        assert!(json.contains("\"stage\":\"extract\""));

        let deserialized: TaskState = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, state);
    }

    #[test]
    fn test_failed_state_serialization() {
        let state = TaskState::Failed {
            error: TaskFailure::new(FailureKind::Cancelled, "task cancelled"),
            progress: 40.0,
            failed_at: Utc::now(),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"kind\":\"cancelled\""));

        let deserialized: TaskState = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, state);
    }

    #[test]
    fn test_output_format_extension() {
        assert_eq!(OutputFormat::Text.extension(), "txt");
        assert_eq!(OutputFormat::Markdown.extension(), "md");
    }

    #[test]
    fn test_task_input_builder() {
        let input = TaskInput::new("https://example.com/talk.mp4")
            .with_model("base")
            .with_language("en")
            .with_output_format(OutputFormat::Markdown);
        assert_eq!(input.source_url, "https://example.com/talk.mp4");
        assert_eq!(input.model.as_deref(), Some("base"));
        assert_eq!(input.language.as_deref(), Some("en"));
        assert_eq!(input.output_format, OutputFormat::Markdown);
    }

    #[test]
    fn test_task_input_serialization_skips_absent_fields() {
        let input = TaskInput::new("https://example.com/a.mp3");
        let json = serde_json::to_string(&input).unwrap();
        assert!(!json.contains("model"));
        assert!(!json.contains("language"));
        assert!(!json.contains("source_kind"));
    }
}
