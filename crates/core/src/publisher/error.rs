//! Error types for the publisher module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while publishing artifacts.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Rendered file to publish does not exist.
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// The storage backend refused the artifact.
    #[error("Storage rejected artifact: {reason}")]
    StorageRejected { reason: String },

    /// I/O error while writing to storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PublishError {
    /// Whether a retry of the same publish may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
