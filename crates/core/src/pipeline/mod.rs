//! Pipeline execution for transcription tasks.

mod config;
mod context;
mod executor;

pub use config::{PipelineConfig, RetryConfig};
pub use context::PipelineContext;
pub use executor::{PipelineExecutor, StageAdapters};
