//! Error types for the transcriber module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during transcription.
#[derive(Debug, Error)]
pub enum TranscribeError {
    /// Inference CLI not found.
    #[error("Whisper CLI not found at path: {path}")]
    WhisperNotFound { path: PathBuf },

    /// Audio file not found.
    #[error("Audio file not found: {path}")]
    AudioNotFound { path: PathBuf },

    /// Inference process failed.
    #[error("Transcription failed: {reason}")]
    TranscriptionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The CLI finished without producing its JSON output.
    #[error("Transcription produced no output file")]
    OutputMissing,

    /// Failed to parse the CLI's JSON output.
    #[error("Failed to parse transcription output: {reason}")]
    ParseError { reason: String },

    /// Inference timed out.
    #[error("Transcription timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error during transcription.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscribeError {
    /// Creates a new transcription failed error with stderr output.
    pub fn transcription_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::TranscriptionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Whether a retry of the same transcription may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(TranscribeError::Timeout { timeout_secs: 60 }.is_transient());
        assert!(!TranscribeError::OutputMissing.is_transient());
        assert!(!TranscribeError::transcription_failed("model crashed", None).is_transient());
    }
}
