//! Configuration for the audio extractor.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the ffmpeg-based audio extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Path to the ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Extraction timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Target sample rate of the extracted audio.
    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: u32,

    /// Target channel count of the extracted audio.
    #[serde(default = "default_channels")]
    pub channels: u8,

    /// ffmpeg log level.
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Extra arguments appended to every ffmpeg invocation.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_timeout() -> u64 {
    600 // 10 minutes
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_channels() -> u8 {
    1
}

fn default_log_level() -> String {
    "error".to_string()
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            timeout_secs: default_timeout(),
            sample_rate_hz: default_sample_rate(),
            channels: default_channels(),
            ffmpeg_log_level: default_log_level(),
            extra_ffmpeg_args: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExtractorConfig::default();
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.sample_rate_hz, 16000);
        assert_eq!(config.channels, 1);
        assert_eq!(config.timeout_secs, 600);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ExtractorConfig = toml::from_str(
            r#"
            sample_rate_hz = 44100
        "#,
        )
        .unwrap();
        assert_eq!(config.sample_rate_hz, 44100);
        assert_eq!(config.channels, 1);
    }
}
