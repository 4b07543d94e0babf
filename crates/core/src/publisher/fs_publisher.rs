//! File system based artifact publisher.

use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

use crate::task::ArtifactDescriptor;

use super::config::StorageConfig;
use super::error::PublishError;
use super::traits::{ArtifactPublisher, PublishRequest};

/// Publisher that copies artifacts under a storage root directory.
///
/// Object keys follow `transcripts/<task id>/<file name>` (with the
/// configured prefix prepended), so a future object-store backend can reuse
/// the same key layout.
pub struct FsPublisher {
    config: StorageConfig,
}

impl FsPublisher {
    /// Creates a new filesystem publisher with the given configuration.
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Creates a publisher with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(StorageConfig::default())
    }

    /// Builds the object key for a task artifact.
    fn object_key(&self, task_id: &str, file_name: &str) -> String {
        let key = format!("transcripts/{}/{}", task_id, file_name);
        match self.config.key_prefix {
            Some(ref prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
            None => key,
        }
    }
}

#[async_trait]
impl ArtifactPublisher for FsPublisher {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn publish(
        &self,
        task_id: &str,
        file: &Path,
        request: &PublishRequest,
    ) -> Result<ArtifactDescriptor, PublishError> {
        if !file.exists() {
            return Err(PublishError::SourceNotFound {
                path: file.to_path_buf(),
            });
        }

        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| PublishError::StorageRejected {
                reason: format!("artifact path has no file name: {}", file.display()),
            })?;

        let object_key = self.object_key(task_id, &file_name);
        let dest_path = self.config.root.join(&object_key);

        if let Some(parent) = dest_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let size_bytes = tokio::fs::copy(file, &dest_path).await?;

        debug!(
            task_id = %task_id,
            key = %object_key,
            bytes = size_bytes,
            "Artifact published"
        );

        Ok(ArtifactDescriptor {
            file_name,
            location: object_key,
            size_bytes,
            detected_language: request.detected_language.clone(),
            format: request.format,
        })
    }

    fn resolve_location(&self, location: &str) -> String {
        // Already-absolute URLs pass through unchanged
        if location.starts_with("http://") || location.starts_with("https://") {
            return location.to_string();
        }
        match self.config.public_base_url {
            Some(ref base) => format!("{}/{}", base.trim_end_matches('/'), location),
            None => self.config.root.join(location).to_string_lossy().to_string(),
        }
    }
}
