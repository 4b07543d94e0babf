//! Trait definitions for the transcriber module.

use async_trait::async_trait;
use std::path::Path;

use super::error::TranscribeError;
use super::types::{Transcript, TranscribeOptions};

/// A speech-to-text engine.
///
/// May be slow and CPU/GPU-bound; the orchestrator treats it as a black box
/// and only relies on the error classification for retry decisions.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Returns the name of this transcriber implementation.
    fn name(&self) -> &str;

    /// Runs inference on the audio file and returns the transcript.
    async fn transcribe(
        &self,
        audio: &Path,
        options: &TranscribeOptions,
    ) -> Result<Transcript, TranscribeError>;
}
