pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod extractor;
pub mod fetcher;
pub mod metrics;
pub mod pipeline;
pub mod progress;
pub mod publisher;
pub mod render;
pub mod task;
pub mod testing;
pub mod transcriber;

pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use dispatcher::{DispatcherConfig, DispatcherError, DispatcherStatus, TaskDispatcher};
pub use extractor::{AudioExtractor, ExtractorConfig, FfmpegExtractor};
pub use fetcher::{Fetcher, FetcherConfig, HttpFetcher, MediaFetcher, SourceKind, YtDlpFetcher};
pub use pipeline::{PipelineConfig, PipelineExecutor, StageAdapters};
pub use progress::{ProgressBus, ProgressEvent};
pub use publisher::{ArtifactPublisher, FsPublisher, StorageConfig};
pub use task::{
    ArtifactDescriptor, CreateTaskRequest, FailureKind, OutputFormat, SqliteTaskStore, Stage,
    Task, TaskError, TaskFailure, TaskFilter, TaskInput, TaskState, TaskStore,
};
pub use transcriber::{Transcriber, TranscriberConfig, WhisperCliTranscriber};
