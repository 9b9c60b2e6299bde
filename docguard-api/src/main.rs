//! docguard-api - document sensitivity classification service
//!
//! Uploads documents, classifies them with two hosted models plus local
//! detectors, routes doubtful results to human review and persists
//! everything to the SQLite warehouse.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use docguard_common::config::{load_toml_config_or_default, RootFolderInitializer, RootFolderResolver};
use docguard_common::events::EventBus;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use docguard_api::config::ServiceConfig;
use docguard_api::warehouse::Warehouse;
use docguard_api::AppState;

/// Command-line arguments for docguard-api
#[derive(Parser, Debug)]
#[command(name = "docguard-api")]
#[command(about = "Document sensitivity classification service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the TOML `port`)
    #[arg(short, long, env = "DOCGUARD_PORT")]
    port: Option<u16>,

    /// Root folder for uploads and the warehouse database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Bootstrap TOML file (default: $DOCGUARD_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over the TOML log level
    let toml_config = load_toml_config_or_default(args.config.as_deref());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "docguard_api={level},docguard_common={level},tower_http=info",
            level = toml_config.logging.level
        ))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting docguard-api v{}", env!("CARGO_PKG_VERSION"));

    let root_folder = RootFolderResolver::new("docguard-api")
        .with_cli_arg(args.root_folder)
        .with_toml(&toml_config)
        .resolve();
    RootFolderInitializer::new(root_folder.clone())
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", root_folder.display());

    let config = ServiceConfig::resolve(&toml_config, root_folder, args.port);

    let warehouse = if config.warehouse_enabled {
        info!("Warehouse: {}", config.database_path.display());
        Warehouse::open(&config.database_path).await
    } else {
        info!("Warehouse disabled");
        Warehouse::disabled()
    };

    let event_bus = EventBus::new(256);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;

    let state = AppState::from_config(config, warehouse, event_bus)?;
    let app = docguard_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
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
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
