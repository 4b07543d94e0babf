//! Common test utilities for API testing with mocks.
//!
//! Provides an in-process router over mock stage adapters and a started
//! dispatcher, so tests exercise the full create -> dispatch -> pipeline ->
//! terminal flow without external binaries.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use verbatim_core::pipeline::RetryConfig;
use verbatim_core::testing::{MockExtractor, MockFetcher, MockPublisher, MockTranscriber};
use verbatim_core::{
    create_authenticator, load_config_from_str, Authenticator, Config, PipelineConfig,
    PipelineExecutor, ProgressBus, SqliteTaskStore, StageAdapters, TaskDispatcher, TaskStore,
    TranscriberConfig,
};
use verbatim_server::api::create_router;
use verbatim_server::state::AppState;

// Not every test uses every helper
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub store: Arc<SqliteTaskStore>,
    pub dispatcher: Arc<TaskDispatcher>,
    pub fetcher: MockFetcher,
    pub transcriber: MockTranscriber,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestApp {
    /// Builds a full app over mock adapters with auth disabled.
    pub async fn spawn() -> Self {
        Self::spawn_with_auth("method = \"none\"").await
    }

    /// Builds a full app with the given `[auth]` section body.
    pub async fn spawn_with_auth(auth_toml: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config: Config =
            load_config_from_str(&format!("[auth]\n{}\n", auth_toml)).expect("invalid test config");
        config.pipeline = PipelineConfig {
            temp_dir: temp_dir.path().join("work"),
            retry: RetryConfig {
                max_attempts: 2,
                initial_delay_ms: 1,
                max_delay_ms: 5,
                backoff_multiplier: 2.0,
            },
        };
        config.storage.root = temp_dir.path().join("storage");

        let store = Arc::new(SqliteTaskStore::in_memory().expect("Failed to create store"));
        let bus = Arc::new(ProgressBus::default());

        let fetcher = MockFetcher::new();
        let extractor = MockExtractor::new();
        let transcriber = MockTranscriber::new();
        let publisher = MockPublisher::new();

        let executor = Arc::new(PipelineExecutor::new(
            config.pipeline.clone(),
            TranscriberConfig::default(),
            StageAdapters {
                fetcher: Arc::new(fetcher.clone()),
                extractor: Arc::new(extractor.clone()),
                transcriber: Arc::new(transcriber.clone()),
                publisher: Arc::new(publisher.clone()),
            },
            Arc::clone(&store) as Arc<dyn TaskStore>,
            Arc::clone(&bus),
        ));

        let dispatcher = Arc::new(TaskDispatcher::new(
            config.dispatcher.clone(),
            Arc::clone(&store) as Arc<dyn TaskStore>,
            executor,
            Arc::clone(&bus),
        ));
        dispatcher.start().await;

        let authenticator: Arc<dyn Authenticator> =
            Arc::from(create_authenticator(&config.auth).expect("Failed to create authenticator"));

        let state = Arc::new(AppState::new(
            config,
            authenticator,
            Arc::clone(&store) as Arc<dyn TaskStore>,
            Arc::clone(&dispatcher),
            bus,
            Arc::new(publisher),
        ));

        let router = create_router(state);

        Self {
            router,
            store,
            dispatcher,
            fetcher,
            transcriber,
            _temp_dir: temp_dir,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.request(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.request(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn request(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    /// Raw body fetch (for SSE and metrics responses).
    pub async fn get_raw(&self, uri: &str) -> (StatusCode, String) {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    /// Polls the task endpoint until the task reaches a terminal status.
    pub async fn wait_terminal(&self, task_id: &str) -> serde_json::Value {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let (status, body) = self.get(&format!("/api/v1/tasks/{}", task_id)).await;
            assert_eq!(status, StatusCode::OK);
            let task_status = body["status"].as_str().unwrap_or_default();
            if task_status == "completed" || task_status == "failed" {
                return body;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "task {} never reached a terminal status (currently {})",
                task_id,
                task_status
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
