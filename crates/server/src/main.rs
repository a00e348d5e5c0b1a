use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weaver_core::{
    load_config, validate_config, JobOrchestrator, OrchestratorSettings, ProcessInvoker,
    ResultResolver, StagingStore, TemplatePublisher,
};
use weaver_server::api::create_router;
use weaver_server::metrics::REGISTRY;
use weaver_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
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
    let config_path = std::env::var("WEAVER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;
    info!(version = VERSION, "Configuration loaded successfully");

    // The staging directory must be usable before any request is accepted
    let staging = Arc::new(StagingStore::new(&config.staging.dir));
    staging
        .ensure_ready()
        .await
        .with_context(|| format!("Staging directory {:?} is unusable", config.staging.dir))?;
    info!("Staging directory: {:?}", config.staging.dir);

    let invoker = ProcessInvoker::new(&config.worker);
    if let Err(e) = invoker.validate(&config.worker.auxiliary_path).await {
        // Jobs will fail with spawn_failure until this is fixed
        warn!("Worker check failed: {}", e);
    }
    info!("Worker program: {:?}", config.worker.program);

    let mut publisher = TemplatePublisher::new(config.result.template.clone())
        .context("Invalid result template")?;
    if let Some(dir) = &config.result.serve_dir {
        publisher = publisher.with_artifact_dir(dir);
        info!("Serving results from {:?}", dir);
    }

    let resolver = ResultResolver::with_sensitive_paths(
        Arc::new(publisher),
        config.result.max_error_excerpt,
        config.staging.dir.clone(),
        config.worker.auxiliary_path.clone(),
        config.worker.program.clone(),
    );

    let orchestrator = Arc::new(JobOrchestrator::new(
        OrchestratorSettings::from_config(&config),
        staging,
        Arc::new(invoker),
        resolver,
    ));

    // Force registry initialization so /metrics is complete from the start
    Lazy::force(&REGISTRY);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, orchestrator));
    let app = create_router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
