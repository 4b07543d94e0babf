//! faster-whisper CLI based transcriber implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::config::TranscriberConfig;
use super::error::TranscribeError;
use super::traits::Transcriber;
use super::types::{Transcript, TranscribeOptions, TranscriptSegment};

/// Transcriber that shells out to a faster-whisper compatible CLI.
///
/// The CLI is expected to write `<audio stem>.json` into the output
/// directory with `segments` and `language` fields
/// (`whisper-ctranslate2 --output_format json` produces exactly this).
pub struct WhisperCliTranscriber {
    config: TranscriberConfig,
}

impl WhisperCliTranscriber {
    /// Creates a new transcriber with the given configuration.
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    /// Creates a transcriber with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TranscriberConfig::default())
    }

    /// Builds the CLI argument list for one inference run.
    fn build_args(&self, audio: &Path, options: &TranscribeOptions, output_dir: &Path) -> Vec<String> {
        let mut args = vec![
            audio.to_string_lossy().to_string(),
            "--model".to_string(),
            options.model.clone(),
            "--device".to_string(),
            options.device.clone(),
            "--compute_type".to_string(),
            options.compute_type.clone(),
            "--output_format".to_string(),
            "json".to_string(),
            "--output_dir".to_string(),
            output_dir.to_string_lossy().to_string(),
            "--verbose".to_string(),
            "False".to_string(),
        ];

        if let Some(ref language) = options.language {
            args.extend(["--language".to_string(), language.clone()]);
        }

        args
    }

    async fn run_inference(
        &self,
        audio: &Path,
        options: &TranscribeOptions,
        output_dir: &Path,
    ) -> Result<(), TranscribeError> {
        let args = self.build_args(audio, options, output_dir);

        let child = Command::new(&self.config.whisper_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscribeError::WhisperNotFound {
                        path: self.config.whisper_path.clone(),
                    }
                } else {
                    TranscribeError::Io(e)
                }
            })?;

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let output = match timeout(timeout_duration, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(TranscribeError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(TranscribeError::transcription_failed(
                format!("whisper CLI exited with code: {:?}", output.status.code()),
                if stderr.is_empty() {
                    None
                } else {
                    Some(stderr)
                },
            ));
        }

        Ok(())
    }

    /// Parses the CLI's JSON output into a transcript.
    fn parse_output(json: &str) -> Result<Transcript, TranscribeError> {
        #[derive(Deserialize)]
        struct CliOutput {
            segments: Vec<CliSegment>,
            language: Option<String>,
        }

        #[derive(Deserialize)]
        struct CliSegment {
            start: f64,
            end: f64,
            text: String,
        }

        let output: CliOutput =
            serde_json::from_str(json).map_err(|e| TranscribeError::ParseError {
                reason: format!("Failed to parse whisper JSON output: {}", e),
            })?;

        Ok(Transcript {
            segments: output
                .segments
                .into_iter()
                .map(|s| TranscriptSegment {
                    start_secs: s.start,
                    end_secs: s.end,
                    text: s.text,
                })
                .collect(),
            detected_language: output.language,
        })
    }

    async fn read_output(audio: &Path, output_dir: &Path) -> Result<Transcript, TranscribeError> {
        let stem = audio
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let json_path = output_dir.join(format!("{}.json", stem));

        if !json_path.exists() {
            return Err(TranscribeError::OutputMissing);
        }

        let json = tokio::fs::read_to_string(&json_path).await?;
        Self::parse_output(&json)
    }
}

#[async_trait]
impl Transcriber for WhisperCliTranscriber {
    fn name(&self) -> &str {
        "whisper-cli"
    }

    async fn transcribe(
        &self,
        audio: &Path,
        options: &TranscribeOptions,
    ) -> Result<Transcript, TranscribeError> {
        if !audio.exists() {
            return Err(TranscribeError::AudioNotFound {
                path: audio.to_path_buf(),
            });
        }

        let output_dir = audio.parent().unwrap_or_else(|| Path::new("."));

        debug!(
            audio = %audio.display(),
            model = %options.model,
            device = %options.device,
            "Starting transcription"
        );

        match self.run_inference(audio, options, output_dir).await {
            Ok(()) => {}
            Err(e @ TranscribeError::TranscriptionFailed { .. })
                if options.device.eq_ignore_ascii_case("cuda") =>
            {
                // CUDA setups are flaky; fall back to CPU once before failing
                warn!("CUDA inference failed, falling back to CPU: {}", e);
                let fallback = TranscribeOptions {
                    device: "cpu".to_string(),
                    compute_type: "int8".to_string(),
                    ..options.clone()
                };
                self.run_inference(audio, &fallback, output_dir).await?;
            }
            Err(e) => return Err(e),
        }

        Self::read_output(audio, output_dir).await
    }
}
