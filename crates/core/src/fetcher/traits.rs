//! Trait definitions for the fetcher module.

use async_trait::async_trait;
use std::path::Path;

use super::error::FetchError;
use super::types::{FetchRequest, FetchedMedia};

/// A fetcher that downloads remote media into a local directory.
///
/// Implementations classify their own failures: `FetchError::is_transient`
/// drives the pipeline's retry policy.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Downloads the requested media into `dest_dir`.
    async fn fetch(
        &self,
        request: &FetchRequest,
        dest_dir: &Path,
    ) -> Result<FetchedMedia, FetchError>;
}
