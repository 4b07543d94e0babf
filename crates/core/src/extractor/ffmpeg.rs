//! FFmpeg-based audio extractor implementation.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::config::ExtractorConfig;
use super::error::ExtractError;
use super::traits::{AudioExtractor, ExtractedAudio};

/// FFmpeg-based extractor producing WAV in the configured sample format.
pub struct FfmpegExtractor {
    config: ExtractorConfig,
}

impl FfmpegExtractor {
    /// Creates a new FFmpeg extractor with the given configuration.
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Creates an extractor with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ExtractorConfig::default())
    }

    /// Builds ffmpeg arguments for audio extraction.
    fn build_args(&self, input_path: &Path, output_path: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(), // Overwrite output
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
            "-vn".to_string(), // Drop any video stream
            "-ar".to_string(),
            self.config.sample_rate_hz.to_string(),
            "-ac".to_string(),
            self.config.channels.to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ];

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());
        args.push(output_path.to_string_lossy().to_string());

        args
    }

    async fn run_ffmpeg(&self, input: &Path, output: &Path) -> Result<(), ExtractError> {
        let args = self.build_args(input, output);

        let child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExtractError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ExtractError::Io(e)
                }
            })?;

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let process_output = match timeout(timeout_duration, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                // kill_on_drop reaps the process once the future is dropped
                return Err(ExtractError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        if !process_output.status.success() {
            let stderr = String::from_utf8_lossy(&process_output.stderr).to_string();
            return Err(ExtractError::extraction_failed(
                format!(
                    "FFmpeg exited with code: {:?}",
                    process_output.status.code()
                ),
                if stderr.is_empty() {
                    None
                } else {
                    Some(stderr)
                },
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl AudioExtractor for FfmpegExtractor {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn extract(
        &self,
        input: &Path,
        dest_dir: &Path,
    ) -> Result<ExtractedAudio, ExtractError> {
        if !input.exists() {
            return Err(ExtractError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        tokio::fs::create_dir_all(dest_dir).await?;
        let output_path = dest_dir.join(format!("{}.wav", uuid::Uuid::new_v4()));

        let already_wav = input
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("wav"))
            .unwrap_or(false);

        if already_wav {
            // Fetchers may already produce the target format
            tokio::fs::copy(input, &output_path).await?;
            debug!(input = %input.display(), "Input already WAV, copied through");
        } else {
            self.run_ffmpeg(input, &output_path).await?;
        }

        let size_bytes = tokio::fs::metadata(&output_path).await?.len();

        Ok(ExtractedAudio {
            path: output_path,
            size_bytes,
        })
    }

    async fn validate(&self) -> Result<(), ExtractError> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExtractError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ExtractError::Io(e)
                }
            })?;

        if !output.success() {
            return Err(ExtractError::extraction_failed(
                "ffmpeg -version exited with failure",
                None,
            ));
        }

        Ok(())
    }
}
