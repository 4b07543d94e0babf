//! Trait definitions for the extractor module.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::error::ExtractError;

/// Audio extracted into the fixed inference format.
#[derive(Debug, Clone)]
pub struct ExtractedAudio {
    /// Path of the extracted WAV file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size_bytes: u64,
}

/// An extractor that converts downloaded media into inference-ready audio.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Returns the name of this extractor implementation.
    fn name(&self) -> &str;

    /// Extracts audio from `input` into a WAV file under `dest_dir`.
    async fn extract(&self, input: &Path, dest_dir: &Path)
        -> Result<ExtractedAudio, ExtractError>;

    /// Validates that the extractor is properly configured and ready.
    async fn validate(&self) -> Result<(), ExtractError>;
}
