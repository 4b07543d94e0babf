use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use verbatim_core::{
    create_authenticator, load_config, validate_config, ArtifactPublisher, AudioExtractor,
    Authenticator, FfmpegExtractor, FsPublisher, MediaFetcher, PipelineExecutor, ProgressBus,
    SqliteTaskStore, StageAdapters, TaskDispatcher, TaskStore, WhisperCliTranscriber,
};

use verbatim_server::api::create_router;
use verbatim_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("VERBATIM_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    // Create authenticator
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // Create SQLite task store
    let task_store: Arc<dyn TaskStore> = Arc::new(
        SqliteTaskStore::new(&config.database.path).context("Failed to create task store")?,
    );
    info!("Task store initialized");

    // Create progress bus
    let progress_bus = Arc::new(ProgressBus::default());

    // Create stage adapters
    let fetcher = Arc::new(
        MediaFetcher::from_config(config.fetcher.clone())
            .context("Failed to create media fetcher")?,
    );

    let extractor = Arc::new(FfmpegExtractor::new(config.extractor.clone()));
    if let Err(e) = extractor.validate().await {
        warn!("ffmpeg not available, extraction will fail: {}", e);
    } else {
        info!("ffmpeg available at {:?}", config.extractor.ffmpeg_path);
    }

    let transcriber = Arc::new(WhisperCliTranscriber::new(config.transcriber.clone()));
    info!(
        "Transcriber configured (model: {}, device: {})",
        config.transcriber.model, config.transcriber.device
    );

    let publisher: Arc<dyn ArtifactPublisher> = Arc::new(FsPublisher::new(config.storage.clone()));
    info!("Artifact storage root: {:?}", config.storage.root);

    // Create pipeline executor
    let executor = Arc::new(PipelineExecutor::new(
        config.pipeline.clone(),
        config.transcriber.clone(),
        StageAdapters {
            fetcher,
            extractor,
            transcriber,
            publisher: Arc::clone(&publisher),
        },
        Arc::clone(&task_store),
        Arc::clone(&progress_bus),
    ));

    // Create and start the dispatcher
    let dispatcher = Arc::new(TaskDispatcher::new(
        config.dispatcher.clone(),
        Arc::clone(&task_store),
        executor,
        Arc::clone(&progress_bus),
    ));
    dispatcher.start().await;
    info!(
        "Task dispatcher started (pool size: {})",
        config.dispatcher.max_concurrent_tasks
    );

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        task_store,
        Arc::clone(&dispatcher),
        progress_bus,
        publisher,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop the dispatcher
    info!("Server shutting down...");
    dispatcher.stop().await;
    info!("Dispatcher stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
