//! Pipeline executor implementation.
//!
//! Runs the fixed stage sequence Fetch -> Extract -> Transcribe -> Render ->
//! Publish for one task: persists a state/progress update before each stage,
//! publishes the matching event after every committed write, retries
//! transient stage failures with backoff, and guarantees exactly one
//! terminal transition plus working-directory cleanup on every exit path.

use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::extractor::AudioExtractor;
use crate::fetcher::{FetchRequest, Fetcher};
use crate::metrics::{STAGE_DURATION, STAGE_RETRIES, TASKS_FINISHED};
use crate::progress::{ProgressBus, ProgressEvent};
use crate::publisher::{ArtifactPublisher, PublishRequest};
use crate::render::{output_file_name, render_transcript};
use crate::task::{
    ArtifactDescriptor, FailureKind, Stage, Task, TaskFailure, TaskState, TaskStore,
};
use crate::transcriber::{Transcriber, TranscriberConfig};

use super::config::PipelineConfig;
use super::context::PipelineContext;

/// The four stage adapters the executor drives.
pub struct StageAdapters {
    pub fetcher: Arc<dyn Fetcher>,
    pub extractor: Arc<dyn AudioExtractor>,
    pub transcriber: Arc<dyn Transcriber>,
    pub publisher: Arc<dyn ArtifactPublisher>,
}

/// A classified stage failure, before it is attributed to a stage.
struct StageError {
    transient: bool,
    message: String,
}

impl StageError {
    fn new(transient: bool, message: impl Into<String>) -> Self {
        Self {
            transient,
            message: message.into(),
        }
    }
}

/// Terminal failure of one pipeline run.
struct PipelineFailure {
    kind: FailureKind,
    message: String,
}

/// Executes the transcription pipeline for one task at a time.
///
/// The executor is the sole writer of its task's record while running
/// (enforced by the dispatcher's active-task set).
pub struct PipelineExecutor {
    config: PipelineConfig,
    transcriber_config: TranscriberConfig,
    adapters: StageAdapters,
    store: Arc<dyn TaskStore>,
    bus: Arc<ProgressBus>,
}

impl PipelineExecutor {
    /// Creates a new executor.
    pub fn new(
        config: PipelineConfig,
        transcriber_config: TranscriberConfig,
        adapters: StageAdapters,
        store: Arc<dyn TaskStore>,
        bus: Arc<ProgressBus>,
    ) -> Self {
        Self {
            config,
            transcriber_config,
            adapters,
            store,
            bus,
        }
    }

    /// Runs the full pipeline for a pending task.
    ///
    /// All failure paths end in a single terminal write; nothing escapes
    /// uncaught. Cleanup of the working directory happens on every path,
    /// including unwinds, via the context's drop guard.
    pub async fn run(&self, task_id: &str, cancel_flag: Arc<AtomicBool>) {
        let task = match self.store.get(task_id) {
            Ok(Some(task)) => task,
            Ok(None) => {
                warn!(task_id = %task_id, "Task disappeared before execution");
                return;
            }
            Err(e) => {
                warn!(task_id = %task_id, "Failed to load task: {}", e);
                return;
            }
        };

        if task.state != TaskState::Pending {
            warn!(
                task_id = %task_id,
                state = task.state.state_type(),
                "Task is not pending, skipping execution"
            );
            return;
        }

        let context =
            match PipelineContext::create(&self.config.temp_dir, task_id, cancel_flag).await {
                Ok(context) => context,
                Err(e) => {
                    self.write_failure(
                        task_id,
                        PipelineFailure {
                            kind: FailureKind::Internal,
                            message: format!("failed to create working directory: {}", e),
                        },
                        0.0,
                    );
                    return;
                }
            };

        let started_at = Utc::now();
        let mut progress = 0.0f32;

        let result = self.run_stages(&task, &context, started_at, &mut progress).await;

        match result {
            Ok(artifacts) => {
                info!(task_id = %task_id, "Pipeline completed");
                TASKS_FINISHED.with_label_values(&["completed"]).inc();
                self.write_completion(task_id, artifacts);
            }
            Err(failure) => {
                let result_label = if failure.kind == FailureKind::Cancelled {
                    "cancelled"
                } else {
                    "failed"
                };
                info!(
                    task_id = %task_id,
                    kind = failure.kind.as_str(),
                    "Pipeline failed: {}",
                    failure.message
                );
                TASKS_FINISHED.with_label_values(&[result_label]).inc();
                self.write_failure(task_id, failure, progress);
            }
        }

        context.cleanup().await;
    }

    /// Runs the stage sequence, returning the artifacts on success.
    async fn run_stages(
        &self,
        task: &Task,
        context: &PipelineContext,
        started_at: DateTime<Utc>,
        progress: &mut f32,
    ) -> Result<Vec<ArtifactDescriptor>, PipelineFailure> {
        let task_id = &task.id;
        let work_dir = context.work_dir().to_path_buf();

        // Stage 1: Fetch
        self.begin_stage(task_id, Stage::Fetch, started_at, progress, context)?;
        let fetch_request = FetchRequest {
            url: task.input.source_url.clone(),
            source_kind: task.input.source_kind,
        };
        let media = {
            let fetcher = Arc::clone(&self.adapters.fetcher);
            let request = fetch_request.clone();
            let dest = work_dir.clone();
            self.run_with_retry(task_id, Stage::Fetch, move || {
                let fetcher = Arc::clone(&fetcher);
                let request = request.clone();
                let dest = dest.clone();
                async move {
                    fetcher
                        .fetch(&request, &dest)
                        .await
                        .map_err(|e| StageError::new(e.is_transient(), e.to_string()))
                }
            })
            .await?
        };
        debug!(task_id = %task_id, media = %media.path.display(), "Fetch complete");

        // Stage 2: Extract audio
        self.begin_stage(task_id, Stage::Extract, started_at, progress, context)?;
        let audio = {
            let extractor = Arc::clone(&self.adapters.extractor);
            let input = media.path.clone();
            let dest = work_dir.clone();
            self.run_with_retry(task_id, Stage::Extract, move || {
                let extractor = Arc::clone(&extractor);
                let input = input.clone();
                let dest = dest.clone();
                async move {
                    extractor
                        .extract(&input, &dest)
                        .await
                        .map_err(|e| StageError::new(e.is_transient(), e.to_string()))
                }
            })
            .await?
        };
        debug!(task_id = %task_id, audio = %audio.path.display(), "Audio extraction complete");

        // Stage 3: Transcribe
        self.begin_stage(task_id, Stage::Transcribe, started_at, progress, context)?;
        let options = self.transcriber_config.resolve(&task.input);
        let transcript = {
            let transcriber = Arc::clone(&self.adapters.transcriber);
            let audio_path = audio.path.clone();
            let options = options.clone();
            self.run_with_retry(task_id, Stage::Transcribe, move || {
                let transcriber = Arc::clone(&transcriber);
                let audio_path = audio_path.clone();
                let options = options.clone();
                async move {
                    transcriber
                        .transcribe(&audio_path, &options)
                        .await
                        .map_err(|e| StageError::new(e.is_transient(), e.to_string()))
                }
            })
            .await?
        };

        // Stage 4: Render
        self.begin_stage(task_id, Stage::Render, started_at, progress, context)?;
        let format = task.input.output_format;
        let rendered_path = work_dir.join(output_file_name(format));
        {
            let content = render_transcript(&transcript.full_text(), format);
            let path = rendered_path.clone();
            self.run_with_retry(task_id, Stage::Render, move || {
                let content = content.clone();
                let path = path.clone();
                async move {
                    tokio::fs::write(&path, content.as_bytes())
                        .await
                        .map_err(|e| StageError::new(true, e.to_string()))
                }
            })
            .await?;
        }

        // Stage 5: Publish artifact
        self.begin_stage(task_id, Stage::Publish, started_at, progress, context)?;
        let artifact = {
            let publisher = Arc::clone(&self.adapters.publisher);
            let id = task_id.clone();
            let path = rendered_path.clone();
            let request = PublishRequest {
                format,
                detected_language: transcript.detected_language.clone(),
            };
            self.run_with_retry(task_id, Stage::Publish, move || {
                let publisher = Arc::clone(&publisher);
                let id = id.clone();
                let path = path.clone();
                let request = request.clone();
                async move {
                    publisher
                        .publish(&id, &path, &request)
                        .await
                        .map_err(|e| StageError::new(e.is_transient(), e.to_string()))
                }
            })
            .await?
        };

        Ok(vec![artifact])
    }

    /// Persists and announces the start of a stage, after checking for
    /// cooperative cancellation at the boundary.
    fn begin_stage(
        &self,
        task_id: &str,
        stage: Stage,
        started_at: DateTime<Utc>,
        progress: &mut f32,
        context: &PipelineContext,
    ) -> Result<(), PipelineFailure> {
        if context.is_cancelled() {
            return Err(PipelineFailure {
                kind: FailureKind::Cancelled,
                message: "task cancelled".to_string(),
            });
        }

        // Progress is clamped so polling callers only ever see it move forward
        *progress = progress.max(stage.start_progress());

        let updated = self
            .store
            .update_state(
                task_id,
                TaskState::Running {
                    stage,
                    progress: *progress,
                    started_at,
                },
            )
            .map_err(|e| PipelineFailure {
                kind: FailureKind::Internal,
                message: format!("failed to persist stage transition: {}", e),
            })?;

        // The event mirrors the committed record, never the intent
        self.bus.publish(&ProgressEvent::from_task(
            &updated,
            Some(format!("{} started", stage)),
        ));

        Ok(())
    }

    /// Runs one stage operation, retrying transient failures with backoff.
    async fn run_with_retry<T, Fut>(
        &self,
        task_id: &str,
        stage: Stage,
        mut op: impl FnMut() -> Fut,
    ) -> Result<T, PipelineFailure>
    where
        Fut: Future<Output = Result<T, StageError>>,
    {
        let max_attempts = self.config.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let start = Instant::now();
            match op().await {
                Ok(value) => {
                    STAGE_DURATION
                        .with_label_values(&[stage.as_str()])
                        .observe(start.elapsed().as_secs_f64());
                    return Ok(value);
                }
                Err(e) if e.transient && attempt < max_attempts => {
                    let delay = self.config.retry.delay_for_attempt(attempt);
                    warn!(
                        task_id = %task_id,
                        stage = stage.as_str(),
                        attempt,
                        "Transient stage failure, retrying in {:?}: {}",
                        delay,
                        e.message
                    );
                    STAGE_RETRIES.with_label_values(&[stage.as_str()]).inc();
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(PipelineFailure {
                        kind: stage.failure_kind(),
                        message: e.message,
                    });
                }
            }
        }

        unreachable!("retry loop always returns")
    }

    /// Writes the terminal completed state and publishes the final event.
    fn write_completion(&self, task_id: &str, artifacts: Vec<ArtifactDescriptor>) {
        match self.store.update_state(
            task_id,
            TaskState::Completed {
                artifacts,
                completed_at: Utc::now(),
            },
        ) {
            Ok(updated) => {
                self.bus.publish(&ProgressEvent::from_task(
                    &updated,
                    Some("task completed".to_string()),
                ));
            }
            Err(e) => {
                warn!(task_id = %task_id, "Failed to persist completion: {}", e);
            }
        }
    }

    /// Writes the terminal failed state and publishes the final event.
    fn write_failure(&self, task_id: &str, failure: PipelineFailure, progress: f32) {
        let message = failure.message.clone();
        match self.store.update_state(
            task_id,
            TaskState::Failed {
                error: TaskFailure::new(failure.kind, failure.message),
                progress,
                failed_at: Utc::now(),
            },
        ) {
            Ok(updated) => {
                self.bus
                    .publish(&ProgressEvent::from_task(&updated, Some(message)));
            }
            Err(e) => {
                warn!(task_id = %task_id, "Failed to persist failure: {}", e);
            }
        }
    }
}
