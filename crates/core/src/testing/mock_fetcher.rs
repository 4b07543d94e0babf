//! Mock fetcher for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::fetcher::{FetchError, FetchRequest, FetchedMedia, Fetcher};

/// Mock implementation of the Fetcher trait.
///
/// Provides controllable behavior for testing:
/// - Track fetch requests for assertions
/// - Queue errors to simulate transient/fatal failures
/// - Simulate slow downloads
#[derive(Debug, Clone)]
pub struct MockFetcher {
    /// Recorded fetch requests.
    requests: Arc<RwLock<Vec<FetchRequest>>>,
    /// Errors returned before fetches start succeeding.
    queued_errors: Arc<RwLock<VecDeque<FetchError>>>,
    /// Simulated fetch duration.
    fetch_duration: Arc<RwLock<Duration>>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Create a new mock fetcher.
    pub fn new() -> Self {
        Self {
            requests: Arc::new(RwLock::new(Vec::new())),
            queued_errors: Arc::new(RwLock::new(VecDeque::new())),
            fetch_duration: Arc::new(RwLock::new(Duration::from_millis(0))),
        }
    }

    /// Get all recorded fetch requests.
    pub async fn recorded_requests(&self) -> Vec<FetchRequest> {
        self.requests.read().await.clone()
    }

    /// Get the number of fetch attempts.
    pub async fn fetch_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Queue an error for the next fetch attempt. Queued errors are
    /// consumed in order; once the queue is empty, fetches succeed.
    pub async fn push_error(&self, error: FetchError) {
        self.queued_errors.write().await.push_back(error);
    }

    /// Set the simulated fetch duration.
    pub async fn set_fetch_duration(&self, duration: Duration) {
        *self.fetch_duration.write().await = duration;
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        dest_dir: &Path,
    ) -> Result<FetchedMedia, FetchError> {
        self.requests.write().await.push(request.clone());

        let duration = *self.fetch_duration.read().await;
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }

        if let Some(error) = self.queued_errors.write().await.pop_front() {
            return Err(error);
        }

        tokio::fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join("media.bin");
        tokio::fs::write(&path, b"mock media content").await?;

        Ok(FetchedMedia {
            path,
            title: "mock-media".to_string(),
            size_bytes: 18,
        })
    }
}
