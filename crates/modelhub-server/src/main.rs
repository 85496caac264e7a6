//! Model Hub Server
//!
//! Loads the configured models once at startup and serves predictions over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use modelhub_backends::{
    builtin_backends, catalog_backends, CandleLoader, CatalogConfig, ModelRegistry, PipelineLoader,
};
use modelhub_server::{create_router, AppState, Cli, LogFormat, ServerConfig};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format);

    info!("Starting Model Hub server");

    // Load configuration
    let config = ServerConfig::load(&cli.config, &cli)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;
    info!("Configuration loaded successfully");
    info!("Allowed origins: {:?}", config.allowed_origins);

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    let registry = build_registry(&config)?;
    info!("Registered {} models, loading weights...", registry.len());

    let registry = tokio::task::spawn_blocking(move || {
        let mut registry = registry;
        registry.initialize_all();
        registry
    })
    .await
    .context("Model initialization task failed")?;

    metrics::gauge!("modelhub_models_ready").set(registry.ready_count() as f64);

    let state = AppState::new(Arc::new(registry)).with_metrics(metrics_handle);
    let app = create_router(state, &config);

    let addr = config.socket_addr().context("Invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Model Hub listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            warn!("Shutdown signal received, stopping server...");
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Build the registry from the catalog file, or the built-in models
fn build_registry(config: &ServerConfig) -> Result<ModelRegistry> {
    let mut loader = CandleLoader::new()
        .with_token(config.hf_token.clone())
        .with_device(config.device);
    if let Some(cache_dir) = &config.cache_dir {
        loader = loader.with_cache_dir(cache_dir);
    }
    info!(
        "Model cache: {} (device {})",
        loader.cache_dir().display(),
        loader.device()
    );
    let loader: Arc<dyn PipelineLoader> = Arc::new(loader);

    let backends = match &config.catalog {
        Some(path) => {
            let catalog = CatalogConfig::from_file(path)
                .with_context(|| format!("Failed to load model catalog {}", path.display()))?;
            info!("Using model catalog {} ({} models)", path.display(), catalog.models.len());
            catalog_backends(&catalog, loader)
        }
        None => builtin_backends(loader),
    };

    ModelRegistry::from_backends(backends).context("Failed to register models")
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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

/// Initialize tracing/logging
fn init_tracing(verbose: bool, format: LogFormat) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("modelhub=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("modelhub=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "modelhub_requests_total",
        "Total number of API requests by endpoint"
    );
    metrics::describe_counter!(
        "modelhub_predictions_total",
        "Total number of predictions by model and outcome"
    );
    metrics::describe_histogram!(
        "modelhub_predict_latency_us",
        metrics::Unit::Microseconds,
        "Prediction latency in microseconds by model"
    );
    metrics::describe_gauge!("modelhub_models_ready", "Number of models ready to serve");

    info!("Metrics exporter initialized");
    Ok(handle)
}
