//! Mock artifact publisher for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::publisher::{ArtifactPublisher, PublishError, PublishRequest};
use crate::task::ArtifactDescriptor;

/// A recorded publish call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedPublish {
    pub task_id: String,
    pub file: PathBuf,
}

/// Mock implementation of the ArtifactPublisher trait.
#[derive(Debug, Clone)]
pub struct MockPublisher {
    /// Recorded publish calls.
    publishes: Arc<RwLock<Vec<RecordedPublish>>>,
    /// Errors returned before publishes start succeeding.
    queued_errors: Arc<RwLock<VecDeque<PublishError>>>,
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPublisher {
    /// Create a new mock publisher.
    pub fn new() -> Self {
        Self {
            publishes: Arc::new(RwLock::new(Vec::new())),
            queued_errors: Arc::new(RwLock::new(VecDeque::new())),
        }
    }

    /// Get all recorded publish calls.
    pub async fn recorded_publishes(&self) -> Vec<RecordedPublish> {
        self.publishes.read().await.clone()
    }

    /// Get the number of publish attempts.
    pub async fn publish_count(&self) -> usize {
        self.publishes.read().await.len()
    }

    /// Queue an error for the next publish attempt.
    pub async fn push_error(&self, error: PublishError) {
        self.queued_errors.write().await.push_back(error);
    }
}

#[async_trait]
impl ArtifactPublisher for MockPublisher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn publish(
        &self,
        task_id: &str,
        file: &Path,
        request: &PublishRequest,
    ) -> Result<ArtifactDescriptor, PublishError> {
        self.publishes.write().await.push(RecordedPublish {
            task_id: task_id.to_string(),
            file: file.to_path_buf(),
        });

        if let Some(error) = self.queued_errors.write().await.pop_front() {
            return Err(error);
        }

        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "artifact".to_string());

        Ok(ArtifactDescriptor {
            file_name: file_name.clone(),
            location: format!("transcripts/{}/{}", task_id, file_name),
            size_bytes: 128,
            detected_language: request.detected_language.clone(),
            format: request.format,
        })
    }

    fn resolve_location(&self, location: &str) -> String {
        format!("mock://{}", location)
    }
}
