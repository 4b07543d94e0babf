//! Trait definitions for the publisher module.

use async_trait::async_trait;
use std::path::Path;

use crate::task::{ArtifactDescriptor, OutputFormat};

use super::error::PublishError;

/// Metadata attached to a published artifact.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Content format of the artifact.
    pub format: OutputFormat,
    /// Language detected by the transcriber, carried onto the descriptor.
    pub detected_language: Option<String>,
}

/// A publisher that persists rendered artifacts to durable storage.
#[async_trait]
pub trait ArtifactPublisher: Send + Sync {
    /// Returns the name of this publisher implementation.
    fn name(&self) -> &str;

    /// Stores the rendered file for the task and returns its descriptor.
    async fn publish(
        &self,
        task_id: &str,
        file: &Path,
        request: &PublishRequest,
    ) -> Result<ArtifactDescriptor, PublishError>;

    /// Resolves a stored location into a caller-usable URL or path.
    fn resolve_location(&self, location: &str) -> String;
}
