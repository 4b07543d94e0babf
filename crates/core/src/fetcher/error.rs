//! Error types for the fetcher module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching remote media.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid media URL: {url}")]
    InvalidUrl { url: String },

    /// The HTTP request failed before a response arrived.
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Server returned HTTP {status}")]
    HttpStatus { status: u16 },

    /// yt-dlp binary not found.
    #[error("yt-dlp not found at path: {path}")]
    YtDlpNotFound { path: PathBuf },

    /// yt-dlp exited with an error.
    #[error("yt-dlp failed: {reason}")]
    YtDlpFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// yt-dlp finished without producing an audio file.
    #[error("yt-dlp produced no audio file")]
    NoAudioProduced,

    /// Download timed out.
    #[error("Download timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error while writing the download.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Whether a retry of the same fetch may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::RequestFailed(e) => e.is_timeout() || e.is_connect(),
            FetchError::HttpStatus { status } => *status == 429 || *status >= 500,
            FetchError::Timeout { .. } | FetchError::Io(_) => true,
            _ => false,
        }
    }
}
