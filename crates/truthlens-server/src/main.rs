//! TruthLens
//!
//! Deepfake and fake-news detection service.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::path::Path;
use tokio::signal;
use tracing::{info, warn};

use truthlens_detectors::MediaModels;
use truthlens_server::cli::{Cli, Commands, ServeArgs};
use truthlens_server::routes::{
    create_router, ERRORS_TOTAL, INFERENCE_LATENCY_US, REQUESTS_TOTAL, VERDICTS_TOTAL,
};
use truthlens_server::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose, cli.log_json);

    match cli.command() {
        Commands::Serve(args) => serve(&cli.config, &args).await,
        Commands::ExportWeights { out } => export_weights(&cli.config, &out),
    }
}

async fn serve(config_path: &Path, args: &ServeArgs) -> Result<()> {
    info!("Starting TruthLens");

    // Load configuration
    let config = AppConfig::load(config_path, args)?;
    info!("Configuration loaded successfully");
    info!("Upload directory: {}", config.server.upload_dir.display());
    info!(
        "Max upload size: {} bytes",
        config.server.max_upload_bytes
    );

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    let addr: SocketAddr = format!("{}:{}", config.server.listen, config.server.port).parse()?;

    // Model construction and checkpoint downloads block
    info!("Initializing application state...");
    let state = tokio::task::spawn_blocking(move || AppState::new(config, metrics_handle)).await??;
    info!("Application state initialized successfully");

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("TruthLens listening on http://{}", addr);

    // Graceful shutdown handler
    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Write freshly initialized (or configured) media weights to `out`
fn export_weights(config_path: &Path, out: &Path) -> Result<()> {
    let config = AppConfig::from_file(config_path)?;
    let models = MediaModels::new(&config.media)?;
    models.save(out)?;
    info!("Media model weights written to {}", out.display());
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("truthlens=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("truthlens=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(REQUESTS_TOTAL, "Total number of detection requests by endpoint");
    metrics::describe_counter!(
        VERDICTS_TOTAL,
        "Total number of verdicts by endpoint and outcome"
    );
    metrics::describe_histogram!(
        INFERENCE_LATENCY_US,
        metrics::Unit::Microseconds,
        "Detector latency in microseconds by endpoint and media type"
    );
    metrics::describe_counter!(ERRORS_TOTAL, "Total number of failed requests by kind");

    info!("Metrics exporter initialized");
    Ok(handle)
}
