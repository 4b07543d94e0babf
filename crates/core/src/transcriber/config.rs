//! Configuration for the transcriber.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::task::TaskInput;

use super::types::TranscribeOptions;

/// Default model/device settings and the CLI used for inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Default model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Default inference device.
    #[serde(default = "default_device")]
    pub device: String,

    /// Default compute precision.
    #[serde(default = "default_compute_type")]
    pub compute_type: String,

    /// Path to the faster-whisper compatible CLI.
    #[serde(default = "default_whisper_path")]
    pub whisper_path: PathBuf,

    /// Inference timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "tiny".to_string()
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_compute_type() -> String {
    "int8".to_string()
}

fn default_whisper_path() -> PathBuf {
    PathBuf::from("whisper-ctranslate2")
}

fn default_timeout() -> u64 {
    3600 // 1 hour
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            device: default_device(),
            compute_type: default_compute_type(),
            whisper_path: default_whisper_path(),
            timeout_secs: default_timeout(),
        }
    }
}

impl TranscriberConfig {
    /// Resolve effective options for a task, applying its overrides on top
    /// of the configured defaults.
    pub fn resolve(&self, input: &TaskInput) -> TranscribeOptions {
        TranscribeOptions {
            model: input.model.clone().unwrap_or_else(|| self.model.clone()),
            language: input.language.clone(),
            device: input.device.clone().unwrap_or_else(|| self.device.clone()),
            compute_type: input
                .compute_type
                .clone()
                .unwrap_or_else(|| self.compute_type.clone()),
        }
    }
}
