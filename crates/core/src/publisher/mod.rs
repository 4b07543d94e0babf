//! Artifact publishing to durable storage.

mod config;
mod error;
mod fs_publisher;
mod traits;

pub use config::{StorageBackend, StorageConfig};
pub use error::PublishError;
pub use fs_publisher::FsPublisher;
pub use traits::{ArtifactPublisher, PublishRequest};
