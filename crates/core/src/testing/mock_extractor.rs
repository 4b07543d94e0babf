//! Mock audio extractor for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::extractor::{AudioExtractor, ExtractError, ExtractedAudio};

/// Mock implementation of the AudioExtractor trait.
#[derive(Debug, Clone)]
pub struct MockExtractor {
    /// Recorded input paths.
    inputs: Arc<RwLock<Vec<PathBuf>>>,
    /// Errors returned before extractions start succeeding.
    queued_errors: Arc<RwLock<VecDeque<ExtractError>>>,
    /// Simulated extraction duration.
    extract_duration: Arc<RwLock<Duration>>,
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExtractor {
    /// Create a new mock extractor.
    pub fn new() -> Self {
        Self {
            inputs: Arc::new(RwLock::new(Vec::new())),
            queued_errors: Arc::new(RwLock::new(VecDeque::new())),
            extract_duration: Arc::new(RwLock::new(Duration::from_millis(0))),
        }
    }

    /// Get the number of extraction attempts.
    pub async fn extract_count(&self) -> usize {
        self.inputs.read().await.len()
    }

    /// Queue an error for the next extraction attempt.
    pub async fn push_error(&self, error: ExtractError) {
        self.queued_errors.write().await.push_back(error);
    }

    /// Set the simulated extraction duration.
    pub async fn set_extract_duration(&self, duration: Duration) {
        *self.extract_duration.write().await = duration;
    }
}

#[async_trait]
impl AudioExtractor for MockExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn extract(
        &self,
        input: &Path,
        dest_dir: &Path,
    ) -> Result<ExtractedAudio, ExtractError> {
        self.inputs.write().await.push(input.to_path_buf());

        let duration = *self.extract_duration.read().await;
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }

        if let Some(error) = self.queued_errors.write().await.pop_front() {
            return Err(error);
        }

        tokio::fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join("audio.wav");
        tokio::fs::write(&path, b"RIFF mock audio").await?;

        Ok(ExtractedAudio {
            path,
            size_bytes: 15,
        })
    }

    async fn validate(&self) -> Result<(), ExtractError> {
        Ok(())
    }
}
