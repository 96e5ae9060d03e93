use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storyforge_core::{
    load_config, validate_config, GpuGate, HashEmbedder, JsonTaskStore, Pipeline, Scheduler,
    SubprocessCloner, TaskRegistry,
};

use storyforge_server::{create_router, AppState};

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
    let config_path = std::env::var("STORYFORGE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;
    info!("Configuration loaded successfully");

    // Open the task journal and reclassify anything the previous process
    // left unfinished.
    let store = Arc::new(JsonTaskStore::new(&config.storage.data_root));
    let registry = Arc::new(
        TaskRegistry::open(store, config.storage.tasks_root())
            .context("Failed to open task registry")?,
    );
    let recovered = registry
        .recover()
        .context("Failed to recover interrupted tasks")?;
    if recovered > 0 {
        info!("Recovered {} interrupted tasks", recovered);
    }

    // Wire the pipeline: worker-owned collaborators, one GPU gate.
    let gate = Arc::new(GpuGate::new(config.scheduler.gpu_permits));
    let cloner = Arc::new(SubprocessCloner::new(config.cloner.clone()));
    let embedder = Arc::new(HashEmbedder::default());
    let pipeline = Arc::new(Pipeline::new(
        Arc::clone(&registry),
        gate,
        cloner,
        embedder,
        config.pipeline.clone(),
        config.matcher.clone(),
    ));
    let scheduler = Scheduler::start(config.scheduler.clone(), pipeline);
    info!(
        "Scheduler started with {} workers, queue capacity {}",
        config.scheduler.workers, config.scheduler.queue_capacity
    );

    // Create app state and router
    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, registry, scheduler));
    let app = create_router(state);

    // Start server
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
