//! Mock transcriber for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::transcriber::{
    TranscribeError, TranscribeOptions, Transcriber, Transcript, TranscriptSegment,
};

/// Mock implementation of the Transcriber trait.
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    /// Recorded inference options.
    calls: Arc<RwLock<Vec<TranscribeOptions>>>,
    /// Errors returned before transcriptions start succeeding.
    queued_errors: Arc<RwLock<VecDeque<TranscribeError>>>,
    /// Transcript returned on success.
    transcript: Arc<RwLock<Transcript>>,
    /// Simulated inference duration.
    transcribe_duration: Arc<RwLock<Duration>>,
}

impl Default for MockTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscriber {
    /// Create a new mock transcriber producing a single English segment.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            queued_errors: Arc::new(RwLock::new(VecDeque::new())),
            transcript: Arc::new(RwLock::new(Transcript {
                segments: vec![TranscriptSegment {
                    start_secs: 0.0,
                    end_secs: 2.0,
                    text: "hello from the mock transcriber".to_string(),
                }],
                detected_language: Some("en".to_string()),
            })),
            transcribe_duration: Arc::new(RwLock::new(Duration::from_millis(0))),
        }
    }

    /// Get all recorded inference options.
    pub async fn recorded_calls(&self) -> Vec<TranscribeOptions> {
        self.calls.read().await.clone()
    }

    /// Get the number of transcription attempts.
    pub async fn transcribe_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Queue an error for the next transcription attempt.
    pub async fn push_error(&self, error: TranscribeError) {
        self.queued_errors.write().await.push_back(error);
    }

    /// Set the transcript returned on success.
    pub async fn set_transcript(&self, transcript: Transcript) {
        *self.transcript.write().await = transcript;
    }

    /// Set the simulated inference duration.
    pub async fn set_transcribe_duration(&self, duration: Duration) {
        *self.transcribe_duration.write().await = duration;
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcribe(
        &self,
        _audio: &Path,
        options: &TranscribeOptions,
    ) -> Result<Transcript, TranscribeError> {
        self.calls.write().await.push(options.clone());

        let duration = *self.transcribe_duration.read().await;
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }

        if let Some(error) = self.queued_errors.write().await.pop_front() {
            return Err(error);
        }

        Ok(self.transcript.read().await.clone())
    }
}
