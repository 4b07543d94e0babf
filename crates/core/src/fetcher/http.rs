//! Plain HTTP/HTTPS media fetcher.

use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::config::FetcherConfig;
use super::error::FetchError;
use super::traits::Fetcher;
use super::types::{FetchRequest, FetchedMedia};

/// Fetcher for plain HTTP(S) URLs using a streaming download.
pub struct HttpFetcher {
    config: FetcherConfig,
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a new HTTP fetcher with the given configuration.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs));

        if let Some(proxy_url) = config.effective_proxy() {
            let mut proxy = reqwest::Proxy::all(proxy_url)?;
            if let Some(ref bypass) = config.proxy_bypass {
                proxy = proxy.no_proxy(reqwest::NoProxy::from_string(bypass));
            }
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;
        Ok(Self { config, client })
    }

    /// Creates a fetcher with default configuration.
    pub fn with_defaults() -> Result<Self, FetchError> {
        Self::new(FetcherConfig::default())
    }

    /// Derives a display title from the URL path, ignoring the query string.
    fn title_from_url(url: &str, fallback: &str) -> String {
        url.split('?')
            .next()
            .and_then(|base| base.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        dest_dir: &Path,
    ) -> Result<FetchedMedia, FetchError> {
        if !request.url.starts_with("http://") && !request.url.starts_with("https://") {
            return Err(FetchError::InvalidUrl {
                url: request.url.clone(),
            });
        }

        tokio::fs::create_dir_all(dest_dir).await?;

        let response = self.client.get(&request.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let file_name = uuid::Uuid::new_v4().to_string();
        let local_path = dest_dir.join(&file_name);

        let mut file = tokio::fs::File::create(&local_path).await?;
        let mut stream = response.bytes_stream();
        let mut total_bytes = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            total_bytes += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(
            url = %request.url,
            bytes = total_bytes,
            timeout_secs = self.config.timeout_secs,
            "HTTP download complete"
        );

        let title = Self::title_from_url(&request.url, &file_name);

        Ok(FetchedMedia {
            path: local_path,
            title,
            size_bytes: total_bytes,
        })
    }
}
