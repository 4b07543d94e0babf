//! Configuration for artifact storage.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Artifact storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend.
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory for the filesystem backend.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Optional prefix prepended to every object key.
    #[serde(default)]
    pub key_prefix: Option<String>,

    /// Public base URL for serving stored artifacts. When set, resolved
    /// artifact locations are `<base>/<object key>`.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

/// Available artifact storage backends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    // Future: S3
}

fn default_root() -> PathBuf {
    PathBuf::from("storage")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            root: default_root(),
            key_prefix: None,
            public_base_url: None,
        }
    }
}
