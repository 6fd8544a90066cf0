//! Churn Prediction Service - Main Entry Point
//!
//! Loads the fitted artifacts once, then serves predictions over HTTP.

use anyhow::{Context, Result};
use churn_service::{
    api::{self, AppState},
    config::{AppConfig, LoggingConfig},
    metrics::MetricsReporter,
    pipeline::ChurnPipeline,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    init_logging(&config.logging)?;
    info!("Starting Churn Prediction Service");
    info!(
        default_threshold = config.decision.default_threshold,
        model = %config.artifacts.model,
        "Configuration loaded successfully"
    );

    // Artifacts are required: refuse to start without them
    let pipeline = ChurnPipeline::load(&config.artifacts).context("Failed to load artifacts")?;
    let state = AppState::new(Arc::new(pipeline), config.default_threshold());

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(state.metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let metrics = state.metrics.clone();
    let app = api::router(state);

    let bind_addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("warn")
            .add_directive(format!("churn_service={}", logging.level).parse()?),
    };

    if logging.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
