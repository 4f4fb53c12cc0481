//! Folio API Server
//!
//! Authentication server for the Folio portfolio backend.

use anyhow::Context;
use clap::Parser;
use folio_api::{auth::spawn_revocation_sweeper, create_router, state::AppState};
use folio_core::config::{AppConfig, LoggingConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "folio-api")]
#[command(about = "Folio authentication API server")]
#[command(version)]
struct Args {
    /// TOML configuration file (environment variables still override it)
    #[arg(long, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration: --config <path> or FOLIO_CONFIG, otherwise env only
    let config = match args.config {
        Some(path) => AppConfig::from_file(&path)
            .and_then(AppConfig::with_env_override)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AppConfig::from_env().context("loading configuration from environment")?,
    };

    init_tracing(&config.logging);
    config.validate().context("invalid configuration")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let sweep_interval = Duration::from_secs(config.auth.sweep_interval_secs.max(1));
    tracing::info!(
        environment = %config.server.environment,
        access_ttl_secs = config.auth.access_token_ttl_secs,
        refresh_ttl_secs = config.auth.refresh_token_ttl_secs,
        "Configuration loaded"
    );

    // Create application state
    let state = Arc::new(AppState::new(config).context("initializing password hashing")?);
    let sweeper = spawn_revocation_sweeper(state.revocations.clone(), sweep_interval);

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Folio API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("Server stopped");

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received");
}
