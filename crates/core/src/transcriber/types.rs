//! Transcriber data types.

use serde::{Deserialize, Serialize};

/// Effective inference options for one transcription.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscribeOptions {
    /// Model name (e.g. "tiny", "base").
    pub model: String,
    /// Language hint (ISO 639-1 code). None = auto-detect.
    pub language: Option<String>,
    /// Inference device (e.g. "cpu", "cuda").
    pub device: String,
    /// Compute precision (e.g. "int8", "float16").
    pub compute_type: String,
}

/// Timestamped transcript chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptSegment {
    /// Segment start time in seconds.
    pub start_secs: f64,
    /// Segment end time in seconds.
    pub end_secs: f64,
    /// Text content for this segment.
    pub text: String,
}

/// Full inference result returned by a transcriber.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transcript {
    /// Segment-level timing and text details, in order.
    pub segments: Vec<TranscriptSegment>,
    /// Detected language if available.
    pub detected_language: Option<String>,
}

impl Transcript {
    /// Concatenated transcript text, one segment per line.
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
