//! Pipeline executor integration tests.
//!
//! These tests drive the executor with mock stage adapters and verify:
//! - Stage ordering and forward-only progress
//! - Terminal state writes (completed/failed) and their events
//! - Transient retry behavior and fatal failure handling
//! - Cooperative cancellation at stage boundaries
//! - Working directory cleanup on every terminal path

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use verbatim_core::{
    extractor::ExtractError,
    fetcher::FetchError,
    pipeline::{PipelineConfig, PipelineExecutor, RetryConfig, StageAdapters},
    progress::{ProgressBus, ProgressEvent},
    publisher::PublishError,
    task::{CreateTaskRequest, FailureKind, OutputFormat, SqliteTaskStore, TaskInput, TaskStore},
    testing::{MockExtractor, MockFetcher, MockPublisher, MockTranscriber},
    transcriber::{TranscribeError, TranscriberConfig},
};

/// Test helper wiring the executor to mock adapters.
struct TestHarness {
    executor: Arc<PipelineExecutor>,
    store: Arc<SqliteTaskStore>,
    bus: Arc<ProgressBus>,
    fetcher: MockFetcher,
    extractor: MockExtractor,
    transcriber: MockTranscriber,
    publisher: MockPublisher,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let config = PipelineConfig {
            temp_dir: temp_dir.path().join("work"),
            retry: RetryConfig {
                max_attempts: 3,
                initial_delay_ms: 1,
                max_delay_ms: 5,
                backoff_multiplier: 2.0,
            },
        };

        let store = Arc::new(SqliteTaskStore::in_memory().expect("Failed to create store"));
        let bus = Arc::new(ProgressBus::default());
        let fetcher = MockFetcher::new();
        let extractor = MockExtractor::new();
        let transcriber = MockTranscriber::new();
        let publisher = MockPublisher::new();

        let adapters = StageAdapters {
            fetcher: Arc::new(fetcher.clone()),
            extractor: Arc::new(extractor.clone()),
            transcriber: Arc::new(transcriber.clone()),
            publisher: Arc::new(publisher.clone()),
        };

        let executor = Arc::new(PipelineExecutor::new(
            config,
            TranscriberConfig::default(),
            adapters,
            Arc::clone(&store) as Arc<dyn TaskStore>,
            Arc::clone(&bus),
        ));

        Self {
            executor,
            store,
            bus,
            fetcher,
            extractor,
            transcriber,
            publisher,
            temp_dir,
        }
    }

    fn create_task(&self, input: TaskInput) -> String {
        self.store
            .create(CreateTaskRequest {
                created_by: "test".to_string(),
                input,
            })
            .expect("Failed to create task")
            .id
    }

    fn work_dir(&self, task_id: &str) -> std::path::PathBuf {
        self.temp_dir.path().join("work").join(task_id)
    }

    async fn run(&self, task_id: &str) {
        self.executor
            .run(task_id, Arc::new(AtomicBool::new(false)))
            .await;
    }

    /// Collects events published for a task until the terminal one.
    async fn collect_events(
        mut rx: tokio::sync::mpsc::Receiver<ProgressEvent>,
    ) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_secs(5), rx.recv()).await
        {
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }
}

// =============================================================================
// Happy Path Tests
// =============================================================================

#[tokio::test]
async fn test_pipeline_completes_with_text_artifact() {
    let harness = TestHarness::new();
    let task_id =
        harness.create_task(TaskInput::new("https://example.com/talk.mp4"));

    let rx = harness.bus.subscribe(&task_id);
    harness.run(&task_id).await;

    let task = harness.store.get(&task_id).unwrap().unwrap();
    assert_eq!(task.state.state_type(), "completed");

    let artifacts = task.state.artifacts();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].format, OutputFormat::Text);
    assert_eq!(artifacts[0].file_name, "transcript.txt");
    assert_eq!(artifacts[0].detected_language.as_deref(), Some("en"));

    // Stages observed in order, terminated by exactly one terminal event
    let events = TestHarness::collect_events(rx).await;
    let stages: Vec<String> = events
        .iter()
        .filter_map(|e| e.stage.map(|s| s.to_string()))
        .collect();
    assert_eq!(
        stages,
        vec!["fetch", "extract", "transcribe", "render", "publish"]
    );
    assert_eq!(events.last().unwrap().status, "completed");
    assert_eq!(
        events.iter().filter(|e| e.is_terminal()).count(),
        1,
        "exactly one terminal event"
    );
}

#[tokio::test]
async fn test_progress_is_monotonically_non_decreasing() {
    let harness = TestHarness::new();
    let task_id =
        harness.create_task(TaskInput::new("https://example.com/talk.mp4"));

    let rx = harness.bus.subscribe(&task_id);
    harness.run(&task_id).await;

    let events = TestHarness::collect_events(rx).await;
    let mut last = -1.0f32;
    for event in &events {
        assert!(
            event.progress >= last,
            "progress went backwards: {} -> {}",
            last,
            event.progress
        );
        last = event.progress;
    }
    assert_eq!(events.last().unwrap().progress, 100.0);
}

#[tokio::test]
async fn test_pipeline_markdown_output() {
    let harness = TestHarness::new();
    let task_id = harness.create_task(
        TaskInput::new("https://example.com/talk.mp4")
            .with_output_format(OutputFormat::Markdown),
    );

    harness.run(&task_id).await;

    let task = harness.store.get(&task_id).unwrap().unwrap();
    let artifacts = task.state.artifacts();
    assert_eq!(artifacts[0].format, OutputFormat::Markdown);
    assert_eq!(artifacts[0].file_name, "transcript.md");
}

#[tokio::test]
async fn test_pipeline_resolves_transcriber_defaults() {
    let harness = TestHarness::new();
    let task_id = harness.create_task(
        TaskInput::new("https://example.com/talk.mp4").with_model("base"),
    );

    harness.run(&task_id).await;

    let calls = harness.transcriber.recorded_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].model, "base");
    // Defaults fill in what the request left out
    assert_eq!(calls[0].device, "cpu");
    assert_eq!(calls[0].compute_type, "int8");
}

#[tokio::test]
async fn test_working_directory_removed_after_success() {
    let harness = TestHarness::new();
    let task_id =
        harness.create_task(TaskInput::new("https://example.com/talk.mp4"));

    harness.run(&task_id).await;

    assert!(!harness.work_dir(&task_id).exists());
}

// =============================================================================
// Failure Tests
// =============================================================================

#[tokio::test]
async fn test_fatal_fetch_failure_skips_later_stages() {
    let harness = TestHarness::new();
    let task_id =
        harness.create_task(TaskInput::new("https://unreachable.example.com/a.mp3"));

    harness
        .fetcher
        .push_error(FetchError::HttpStatus { status: 404 })
        .await;

    harness.run(&task_id).await;

    let task = harness.store.get(&task_id).unwrap().unwrap();
    assert_eq!(task.state.state_type(), "failed");
    let failure = task.state.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Fetch);
    assert!(task.state.artifacts().is_empty());

    // No later stage ran
    assert_eq!(harness.extractor.extract_count().await, 0);
    assert_eq!(harness.transcriber.transcribe_count().await, 0);
    assert_eq!(harness.publisher.publish_count().await, 0);

    // Temporary directory removed
    assert!(!harness.work_dir(&task_id).exists());
}

#[tokio::test]
async fn test_transient_failure_retries_to_success() {
    let harness = TestHarness::new();
    let task_id =
        harness.create_task(TaskInput::new("https://example.com/talk.mp4"));

    // Two transient failures, third attempt succeeds (max_attempts = 3)
    harness
        .fetcher
        .push_error(FetchError::HttpStatus { status: 503 })
        .await;
    harness
        .fetcher
        .push_error(FetchError::Timeout { timeout_secs: 60 })
        .await;

    harness.run(&task_id).await;

    let task = harness.store.get(&task_id).unwrap().unwrap();
    assert_eq!(task.state.state_type(), "completed");
    assert_eq!(harness.fetcher.fetch_count().await, 3);
}

#[tokio::test]
async fn test_transient_failures_exhaust_retry_limit() {
    let harness = TestHarness::new();
    let task_id =
        harness.create_task(TaskInput::new("https://example.com/talk.mp4"));

    // As many transient failures as attempts
    for _ in 0..3 {
        harness
            .fetcher
            .push_error(FetchError::HttpStatus { status: 503 })
            .await;
    }

    harness.run(&task_id).await;

    let task = harness.store.get(&task_id).unwrap().unwrap();
    assert_eq!(task.state.state_type(), "failed");
    assert_eq!(task.state.failure().unwrap().kind, FailureKind::Fetch);
    assert_eq!(harness.fetcher.fetch_count().await, 3);
}

#[tokio::test]
async fn test_transcribe_failure_attributed_to_stage() {
    let harness = TestHarness::new();
    let task_id =
        harness.create_task(TaskInput::new("https://example.com/talk.mp4"));

    harness
        .transcriber
        .push_error(TranscribeError::transcription_failed("model crashed", None))
        .await;

    harness.run(&task_id).await;

    let task = harness.store.get(&task_id).unwrap().unwrap();
    let failure = task.state.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Transcribe);
    assert!(failure.message.contains("model crashed"));
    // Earlier stages ran, publish never did
    assert_eq!(harness.fetcher.fetch_count().await, 1);
    assert_eq!(harness.publisher.publish_count().await, 0);
}

#[tokio::test]
async fn test_publish_failure_fails_task() {
    let harness = TestHarness::new();
    let task_id =
        harness.create_task(TaskInput::new("https://example.com/talk.mp4"));

    harness
        .publisher
        .push_error(PublishError::StorageRejected {
            reason: "bucket unavailable".to_string(),
        })
        .await;

    harness.run(&task_id).await;

    let task = harness.store.get(&task_id).unwrap().unwrap();
    assert_eq!(task.state.failure().unwrap().kind, FailureKind::Publish);
    assert!(!harness.work_dir(&task_id).exists());
}

#[tokio::test]
async fn test_extract_transient_error_retried() {
    let harness = TestHarness::new();
    let task_id =
        harness.create_task(TaskInput::new("https://example.com/talk.mp4"));

    harness
        .extractor
        .push_error(ExtractError::Timeout { timeout_secs: 600 })
        .await;

    harness.run(&task_id).await;

    let task = harness.store.get(&task_id).unwrap().unwrap();
    assert_eq!(task.state.state_type(), "completed");
    assert_eq!(harness.extractor.extract_count().await, 2);
}

#[tokio::test]
async fn test_failed_event_carries_error_payload() {
    let harness = TestHarness::new();
    let task_id =
        harness.create_task(TaskInput::new("https://unreachable.example.com/a.mp3"));

    harness
        .fetcher
        .push_error(FetchError::HttpStatus { status: 404 })
        .await;

    let rx = harness.bus.subscribe(&task_id);
    harness.run(&task_id).await;

    let events = TestHarness::collect_events(rx).await;
    let terminal = events.last().unwrap();
    assert_eq!(terminal.status, "failed");
    assert_eq!(terminal.error.as_ref().unwrap().kind, FailureKind::Fetch);
}

// =============================================================================
// Cancellation Tests
// =============================================================================

#[tokio::test]
async fn test_cancellation_before_first_stage() {
    let harness = TestHarness::new();
    let task_id =
        harness.create_task(TaskInput::new("https://example.com/talk.mp4"));

    let cancel = Arc::new(AtomicBool::new(true));
    harness.executor.run(&task_id, cancel).await;

    let task = harness.store.get(&task_id).unwrap().unwrap();
    assert_eq!(task.state.state_type(), "failed");
    assert_eq!(task.state.failure().unwrap().kind, FailureKind::Cancelled);

    // No stage ever started
    assert_eq!(harness.fetcher.fetch_count().await, 0);
    assert!(!harness.work_dir(&task_id).exists());
}

#[tokio::test]
async fn test_cancellation_between_stages() {
    let harness = TestHarness::new();
    let task_id =
        harness.create_task(TaskInput::new("https://example.com/talk.mp4"));

    // Slow down the fetch so the flag flips while it is in flight
    harness
        .fetcher
        .set_fetch_duration(Duration::from_millis(200))
        .await;

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let executor = Arc::clone(&harness.executor);
    let id = task_id.clone();
    let run = tokio::spawn(async move { executor.run(&id, flag).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.store(true, Ordering::SeqCst);
    run.await.unwrap();

    let task = harness.store.get(&task_id).unwrap().unwrap();
    assert_eq!(task.state.state_type(), "failed");
    assert_eq!(task.state.failure().unwrap().kind, FailureKind::Cancelled);

    // The in-flight fetch ran to completion, but no later stage started
    assert_eq!(harness.fetcher.fetch_count().await, 1);
    assert_eq!(harness.extractor.extract_count().await, 0);
    assert!(!harness.work_dir(&task_id).exists());
}

// =============================================================================
// Single Terminal Write Tests
// =============================================================================

#[tokio::test]
async fn test_terminal_state_not_reentered_by_second_run() {
    let harness = TestHarness::new();
    let task_id =
        harness.create_task(TaskInput::new("https://example.com/talk.mp4"));

    harness.run(&task_id).await;
    let first = harness.store.get(&task_id).unwrap().unwrap();
    assert_eq!(first.state.state_type(), "completed");

    // A second run observes the terminal state and does nothing
    harness.run(&task_id).await;
    let second = harness.store.get(&task_id).unwrap().unwrap();
    assert_eq!(second.state, first.state);
    assert_eq!(harness.fetcher.fetch_count().await, 1);
}
