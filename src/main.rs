//! procurement-api - Vendor and product catalogue service
//!
//! This is the main entry point for the procurement-api application.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use procurement_api::auth::{AuthManager, CredentialVerifier, OwnershipGuard, TokenService};
use procurement_api::config::Config;
use procurement_api::database::SqliteDatabase;
use procurement_api::otel::Telemetry;
use procurement_api::server::{AppState, Server};

/// procurement-api - Vendor and product catalogue service
#[derive(Parser, Debug)]
#[command(name = "procurement-api")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "PROCUREMENT_API_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load and validate configuration; a missing or short secret stops here
    let config = load_config(&args)?;

    // Telemetry first so everything after it is logged
    let telemetry = Telemetry::new(&config.otel)?;
    telemetry.init_logging(&config.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        otlp_export = telemetry.is_exporting(),
        "Starting procurement-api"
    );

    // Initialize database
    let database = SqliteDatabase::new(&config.database.path).await?;
    let database = Arc::new(database);
    info!(path = %config.database.path, "Database initialized");

    // Token service, built once and shared
    let secret = config.auth.jwt_secret.as_deref().unwrap_or_default();
    let ttl = i64::try_from(config.auth.token_ttl_hours)
        .ok()
        .and_then(chrono::Duration::try_hours)
        .ok_or_else(|| anyhow::anyhow!("auth.token_ttl_hours is out of range"))?;
    let tokens = Arc::new(TokenService::new(secret, ttl)?);

    let metrics = Arc::new(telemetry.auth_metrics());
    let credentials =
        CredentialVerifier::new(Duration::from_secs(config.auth.credential_timeout_secs));

    let auth_manager = Arc::new(AuthManager::new(
        Arc::clone(&database),
        Arc::clone(&tokens),
        credentials,
        Arc::clone(&metrics),
    ));
    let ownership = Arc::new(OwnershipGuard::new(Arc::clone(&database)).with_metrics(metrics));
    info!(
        token_ttl_hours = config.auth.token_ttl_hours,
        credential_timeout_secs = config.auth.credential_timeout_secs,
        "Authentication initialized"
    );

    // Create application state
    let state = AppState {
        auth_manager,
        database,
        ownership,
    };

    // Bind before serving so a taken port fails startup
    let server = Server::bind(&config.server, state).await?;
    let result = server.serve(shutdown_signal()).await;

    if let Err(e) = telemetry.shutdown() {
        error!(error = %e, "Failed to shut down telemetry");
    }

    info!("procurement-api shutdown complete");

    result.map_err(Into::into)
}

/// Load configuration from file or environment and validate it
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let config = match &args.config {
        Some(path) => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from file: {}", path);
            Config::from_file(path).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?
        }
        None => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from environment variables");
            Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?
        }
    };

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    Ok(config)
}

/// Create a future that resolves when a shutdown signal is received
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
