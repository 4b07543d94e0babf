//! yt-dlp based fetcher for platform-hosted media.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::config::FetcherConfig;
use super::error::FetchError;
use super::traits::Fetcher;
use super::types::{FetchRequest, FetchedMedia};

/// Fetcher that shells out to yt-dlp and extracts best audio as WAV.
///
/// The postprocessor is asked for mono 16 kHz output so the extract stage
/// can pass the file through unchanged.
pub struct YtDlpFetcher {
    config: FetcherConfig,
}

impl YtDlpFetcher {
    /// Creates a new yt-dlp fetcher with the given configuration.
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }

    /// Creates a fetcher with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(FetcherConfig::default())
    }

    /// Builds the yt-dlp argument list for a download.
    fn build_args(&self, url: &str, output_template: &str) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            "bestaudio/best".to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            "wav".to_string(),
            "--audio-quality".to_string(),
            "0".to_string(),
            // Mono 16 kHz so the audio is already in inference format
            "--postprocessor-args".to_string(),
            "-ac 1 -ar 16000".to_string(),
            "--no-playlist".to_string(),
            "--retries".to_string(),
            "3".to_string(),
            "--no-progress".to_string(),
            "-o".to_string(),
            output_template.to_string(),
        ];

        if let Some(proxy) = self.config.effective_proxy() {
            args.extend(["--proxy".to_string(), proxy.to_string()]);
        }

        let player_client = self.config.effective_player_client();
        let mut extractor_args = format!("youtube:player_client={}", player_client);
        if let Some(ref po_token) = self.config.po_token {
            extractor_args.push_str(&format!(";po_token={}", po_token));
        }
        args.extend(["--extractor-args".to_string(), extractor_args]);

        if let Some(ref cookies) = self.config.cookies_file {
            args.extend([
                "--cookies".to_string(),
                cookies.to_string_lossy().to_string(),
            ]);
        }

        args.push(url.to_string());
        args
    }

    /// Finds the WAV file produced by the postprocessor.
    async fn find_output_wav(dest_dir: &Path, stem: &str) -> Result<FetchedMedia, FetchError> {
        let mut entries = tokio::fs::read_dir(dest_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_wav = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("wav"))
                .unwrap_or(false);
            let matches_stem = path
                .file_stem()
                .map(|s| s.to_string_lossy() == stem)
                .unwrap_or(false);
            if is_wav && matches_stem {
                let size_bytes = entry.metadata().await?.len();
                let title = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| stem.to_string());
                return Ok(FetchedMedia {
                    path,
                    title,
                    size_bytes,
                });
            }
        }
        Err(FetchError::NoAudioProduced)
    }
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        dest_dir: &Path,
    ) -> Result<FetchedMedia, FetchError> {
        tokio::fs::create_dir_all(dest_dir).await?;

        if let Some(ref cookies) = self.config.cookies_file {
            if !cookies.exists() {
                return Err(FetchError::YtDlpFailed {
                    reason: format!("cookies file does not exist: {}", cookies.display()),
                    stderr: None,
                });
            }
        }

        let stem = uuid::Uuid::new_v4().to_string();
        let output_template = dest_dir.join(format!("{}.%(ext)s", stem));
        let args = self.build_args(&request.url, &output_template.to_string_lossy());

        debug!(url = %request.url, "Starting yt-dlp download");

        let child = Command::new(&self.config.ytdlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    FetchError::YtDlpNotFound {
                        path: self.config.ytdlp_path.clone(),
                    }
                } else {
                    FetchError::Io(e)
                }
            })?;

        let timeout_duration = Duration::from_secs(self.config.ytdlp_timeout_secs);
        let output = match timeout(timeout_duration, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(FetchError::Timeout {
                    timeout_secs: self.config.ytdlp_timeout_secs,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(FetchError::YtDlpFailed {
                reason: format!("yt-dlp exited with code: {:?}", output.status.code()),
                stderr: if stderr.is_empty() {
                    None
                } else {
                    Some(stderr)
                },
            });
        }

        Self::find_output_wav(dest_dir, &stem).await
    }
}
