//! Dispatcher lifecycle integration tests.
//!
//! These tests verify the dispatcher with mock stage adapters:
//! - Start/stop and submission gating
//! - FIFO admission under a bounded pool
//! - The pending -> running transition happening only at executor start
//! - Cooperative cancellation through the dispatcher
//! - Restart recovery of orphaned running tasks

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;

use verbatim_core::{
    dispatcher::{DispatcherConfig, DispatcherError, TaskDispatcher},
    pipeline::{PipelineConfig, PipelineExecutor, RetryConfig, StageAdapters},
    progress::ProgressBus,
    task::{
        CreateTaskRequest, FailureKind, SqliteTaskStore, Stage, TaskInput, TaskState, TaskStore,
    },
    testing::{MockExtractor, MockFetcher, MockPublisher, MockTranscriber},
    transcriber::TranscriberConfig,
};

/// Test helper wiring a dispatcher to mock adapters.
struct TestHarness {
    dispatcher: TaskDispatcher,
    store: Arc<SqliteTaskStore>,
    fetcher: MockFetcher,
    transcriber: MockTranscriber,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_pool_size(2)
    }

    fn with_pool_size(max_concurrent_tasks: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

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

        let pipeline_config = PipelineConfig {
            temp_dir: temp_dir.path().join("work"),
            retry: RetryConfig {
                max_attempts: 2,
                initial_delay_ms: 1,
                max_delay_ms: 5,
                backoff_multiplier: 2.0,
            },
        };

        let executor = Arc::new(PipelineExecutor::new(
            pipeline_config,
            TranscriberConfig::default(),
            adapters,
            Arc::clone(&store) as Arc<dyn TaskStore>,
            Arc::clone(&bus),
        ));

        let dispatcher = TaskDispatcher::new(
            DispatcherConfig {
                max_concurrent_tasks,
                shutdown_grace_ms: 10,
            },
            Arc::clone(&store) as Arc<dyn TaskStore>,
            executor,
            bus,
        );

        Self {
            dispatcher,
            store,
            fetcher,
            transcriber,
            _temp_dir: temp_dir,
        }
    }

    fn create_task(&self, url: &str) -> String {
        self.store
            .create(CreateTaskRequest {
                created_by: "test".to_string(),
                input: TaskInput::new(url),
            })
            .expect("Failed to create task")
            .id
    }

    fn state_of(&self, task_id: &str) -> String {
        self.store
            .get(task_id)
            .unwrap()
            .unwrap()
            .state
            .state_type()
            .to_string()
    }

    /// Polls the store until the task reaches a terminal state.
    async fn wait_terminal(&self, task_id: &str) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let task = self.store.get(task_id).unwrap().unwrap();
            if task.state.is_terminal() {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "task {} never reached a terminal state (currently {})",
                task_id,
                task.state.state_type()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_submit_rejected_when_not_running() {
    let harness = TestHarness::new();
    let task_id = harness.create_task("https://example.com/a.mp3");

    let result = harness.dispatcher.submit(&task_id);
    assert!(matches!(result, Err(DispatcherError::NotRunning)));
}

#[tokio::test]
async fn test_status_reflects_running_state() {
    let harness = TestHarness::new();

    let status = harness.dispatcher.status().await;
    assert!(!status.running);

    harness.dispatcher.start().await;
    let status = harness.dispatcher.status().await;
    assert!(status.running);

    harness.dispatcher.stop().await;
    let status = harness.dispatcher.status().await;
    assert!(!status.running);
}

#[tokio::test]
async fn test_submitted_task_runs_to_completion() {
    let harness = TestHarness::new();
    harness.dispatcher.start().await;

    let task_id = harness.create_task("https://example.com/a.mp3");
    harness.dispatcher.submit(&task_id).unwrap();

    harness.wait_terminal(&task_id).await;
    assert_eq!(harness.state_of(&task_id), "completed");

    harness.dispatcher.stop().await;
}

// =============================================================================
// Pool Bounding Tests
// =============================================================================

#[tokio::test]
async fn test_pool_bound_holds_excess_task_in_pending() {
    let harness = TestHarness::with_pool_size(1);
    harness.dispatcher.start().await;

    // Slow inference keeps the single slot busy
    harness
        .transcriber
        .set_transcribe_duration(Duration::from_millis(300))
        .await;

    let first = harness.create_task("https://example.com/1.mp3");
    let second = harness.create_task("https://example.com/2.mp3");

    harness.dispatcher.submit(&first).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    harness.dispatcher.submit(&second).unwrap();

    // While the first runs, the second must still be pending
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.state_of(&first), "running");
    assert_eq!(harness.state_of(&second), "pending");

    // Once the slot frees, the second runs to completion
    harness.wait_terminal(&second).await;
    assert_eq!(harness.state_of(&first), "completed");
    assert_eq!(harness.state_of(&second), "completed");

    harness.dispatcher.stop().await;
}

#[tokio::test]
async fn test_fifo_admission_order() {
    let harness = TestHarness::with_pool_size(1);
    harness.dispatcher.start().await;

    harness
        .transcriber
        .set_transcribe_duration(Duration::from_millis(20))
        .await;

    let mut task_ids = Vec::new();
    for i in 0..3 {
        let task_id = harness.create_task(&format!("https://example.com/{}.mp3", i));
        harness.dispatcher.submit(&task_id).unwrap();
        task_ids.push(task_id);
    }

    for task_id in &task_ids {
        harness.wait_terminal(task_id).await;
    }

    // With a single slot, fetches happen in submission order
    let requests = harness.fetcher.recorded_requests().await;
    let urls: Vec<&str> = requests.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://example.com/0.mp3",
            "https://example.com/1.mp3",
            "https://example.com/2.mp3"
        ]
    );

    harness.dispatcher.stop().await;
}

#[tokio::test]
async fn test_duplicate_submission_executes_once() {
    let harness = TestHarness::new();
    harness.dispatcher.start().await;

    let task_id = harness.create_task("https://example.com/a.mp3");
    harness.dispatcher.submit(&task_id).unwrap();
    harness.dispatcher.submit(&task_id).unwrap();

    harness.wait_terminal(&task_id).await;
    // Give the duplicate dispatch a chance to (not) run
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(harness.fetcher.fetch_count().await, 1);

    harness.dispatcher.stop().await;
}

// =============================================================================
// Cancellation Tests
// =============================================================================

#[tokio::test]
async fn test_cancel_running_task_stops_at_boundary() {
    let harness = TestHarness::new();
    harness.dispatcher.start().await;

    harness
        .fetcher
        .set_fetch_duration(Duration::from_millis(200))
        .await;

    let task_id = harness.create_task("https://example.com/a.mp3");
    harness.dispatcher.submit(&task_id).unwrap();

    // Cancel while the fetch stage is in flight
    tokio::time::sleep(Duration::from_millis(50)).await;
    harness.dispatcher.cancel(&task_id).await.unwrap();

    harness.wait_terminal(&task_id).await;

    let task = harness.store.get(&task_id).unwrap().unwrap();
    assert_eq!(task.state.state_type(), "failed");
    assert_eq!(task.state.failure().unwrap().kind, FailureKind::Cancelled);
    assert_eq!(harness.transcriber.transcribe_count().await, 0);

    harness.dispatcher.stop().await;
}

#[tokio::test]
async fn test_cancel_pending_task_never_runs_stages() {
    let harness = TestHarness::with_pool_size(1);
    harness.dispatcher.start().await;

    harness
        .transcriber
        .set_transcribe_duration(Duration::from_millis(200))
        .await;

    let blocker = harness.create_task("https://example.com/blocker.mp3");
    let victim = harness.create_task("https://example.com/victim.mp3");

    harness.dispatcher.submit(&blocker).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    harness.dispatcher.submit(&victim).unwrap();

    // Cancel the queued task before it gets a slot
    harness.dispatcher.cancel(&victim).await.unwrap();

    harness.wait_terminal(&victim).await;
    let task = harness.store.get(&victim).unwrap().unwrap();
    assert_eq!(task.state.failure().unwrap().kind, FailureKind::Cancelled);

    // Only the blocker's URL was ever fetched
    let requests = harness.fetcher.recorded_requests().await;
    assert!(requests.iter().all(|r| r.url.contains("blocker")));

    harness.dispatcher.stop().await;
}

#[tokio::test]
async fn test_cancel_unknown_task() {
    let harness = TestHarness::new();
    harness.dispatcher.start().await;

    let result = harness.dispatcher.cancel("no-such-task").await;
    assert!(matches!(result, Err(DispatcherError::TaskNotFound(_))));

    harness.dispatcher.stop().await;
}

#[tokio::test]
async fn test_cancel_terminal_task_rejected() {
    let harness = TestHarness::new();
    harness.dispatcher.start().await;

    let task_id = harness.create_task("https://example.com/a.mp3");
    harness.dispatcher.submit(&task_id).unwrap();
    harness.wait_terminal(&task_id).await;

    let result = harness.dispatcher.cancel(&task_id).await;
    assert!(matches!(result, Err(DispatcherError::InvalidState { .. })));

    harness.dispatcher.stop().await;
}

// =============================================================================
// Restart Recovery Tests
// =============================================================================

#[tokio::test]
async fn test_start_recovers_orphaned_running_tasks() {
    let harness = TestHarness::new();

    // Simulate a task left running by a previous process
    let task_id = harness.create_task("https://example.com/a.mp3");
    harness
        .store
        .update_state(
            &task_id,
            TaskState::Running {
                stage: Stage::Transcribe,
                progress: 40.0,
                started_at: Utc::now(),
            },
        )
        .unwrap();

    harness.dispatcher.start().await;

    let task = harness.store.get(&task_id).unwrap().unwrap();
    assert_eq!(task.state.state_type(), "failed");
    let failure = task.state.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Interrupted);
    // Progress at interruption is preserved
    assert_eq!(task.state.progress(), 40.0);

    harness.dispatcher.stop().await;
}

#[tokio::test]
async fn test_start_leaves_pending_tasks_alone() {
    let harness = TestHarness::new();
    let task_id = harness.create_task("https://example.com/a.mp3");

    harness.dispatcher.start().await;

    assert_eq!(harness.state_of(&task_id), "pending");

    harness.dispatcher.stop().await;
}
