//! ecosnap-api - EcoSnap progression service
//!
//! Serves report submission, progression views, the leaderboard and the
//! event stream over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use ecosnap_common::config::{prepare_root_folder, resolve_root_folder, TomlConfig};
use ecosnap_common::db::init_database;
use ecosnap_common::events::EventBus;
use ecosnap_common::SystemClock;
use ecosnap_api::classifier::HttpClassifier;
use ecosnap_api::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

const ROOT_FOLDER_ENV: &str = "ECOSNAP_ROOT_FOLDER";

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "ecosnap-api")]
#[command(about = "EcoSnap waste report and progression service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "ECOSNAP_PORT")]
    port: Option<u16>,

    /// Root folder holding the database and badge catalog
    #[arg(short, long, env = "ECOSNAP_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Bootstrap config file
    #[arg(short, long, env = "ECOSNAP_CONFIG")]
    config: Option<PathBuf>,

    /// Detection service base URL (overrides config file)
    #[arg(long, env = "ECOSNAP_CLASSIFIER_URL")]
    classifier_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing starts so its log level can apply
    let config = TomlConfig::load(args.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting EcoSnap API (ecosnap-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &args.config {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No explicit config file; using search path or defaults"),
    }

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &config);
    let db_path = prepare_root_folder(&root_folder)?;
    info!("Root folder: {}", root_folder.display());
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let catalog = config
        .progression
        .load_catalog(&root_folder)
        .context("Failed to load badge catalog")?;
    info!("Badge catalog: {} badges", catalog.len());

    let classifier_url = args
        .classifier_url
        .unwrap_or_else(|| config.classifier.base_url.clone());
    let classifier = HttpClassifier::new(
        &classifier_url,
        Duration::from_millis(config.classifier.timeout_ms),
    )
    .context("Failed to create detection service client")?;
    info!("Detection service: {}", classifier_url);

    let state = AppState::new(
        pool,
        Arc::new(classifier),
        Arc::new(SystemClock),
        catalog,
        EventBus::new(config.event_capacity),
        config.progression.max_write_attempts,
    );
    let app = build_router(state, config.max_body_bytes);

    let port = args.port.unwrap_or(config.port);
    let addr = format!("{}:{}", config.bind_address, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("ecosnap-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
