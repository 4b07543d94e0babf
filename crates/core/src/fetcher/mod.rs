//! Media fetchers.
//!
//! The pipeline talks to a single [`Fetcher`]; [`MediaFetcher`] routes each
//! request to the right variant (plain HTTP vs yt-dlp) based on the source
//! kind, so the orchestrator never inspects URLs itself.

mod config;
mod error;
mod http;
mod traits;
mod types;
mod ytdlp;

pub use config::FetcherConfig;
pub use error::FetchError;
pub use http::HttpFetcher;
pub use traits::Fetcher;
pub use types::{FetchRequest, FetchedMedia, SourceKind};
pub use ytdlp::YtDlpFetcher;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Routing fetcher that dispatches on the request's source kind.
pub struct MediaFetcher {
    http: Arc<dyn Fetcher>,
    youtube: Arc<dyn Fetcher>,
}

impl MediaFetcher {
    pub fn new(http: Arc<dyn Fetcher>, youtube: Arc<dyn Fetcher>) -> Self {
        Self { http, youtube }
    }

    /// Builds the standard pair of fetchers from configuration.
    pub fn from_config(config: FetcherConfig) -> Result<Self, FetchError> {
        let http = Arc::new(HttpFetcher::new(config.clone())?);
        let youtube = Arc::new(YtDlpFetcher::new(config));
        Ok(Self::new(http, youtube))
    }
}

#[async_trait]
impl Fetcher for MediaFetcher {
    fn name(&self) -> &str {
        "media"
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        dest_dir: &Path,
    ) -> Result<FetchedMedia, FetchError> {
        match request.kind() {
            SourceKind::Url => self.http.fetch(request, dest_dir).await,
            SourceKind::Youtube => self.youtube.fetch(request, dest_dir).await,
        }
    }
}
