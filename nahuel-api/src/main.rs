//! nahuel-api - academic catalog HTTP service
//!
//! Serves the catalog of institutions, academic units, careers and titles
//! from a local SQLite database, and accepts title and resolution edits.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use nahuel_common::config::{ConfigOverrides, ServiceConfig, TomlConfig};
use nahuel_common::db::init_database;
use nahuel_common::CodeResolution;
use nahuel_api::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for nahuel-api
#[derive(Parser, Debug)]
#[command(name = "nahuel-api")]
#[command(about = "Academic catalog service")]
#[command(version)]
struct Args {
    /// Config file (default: platform config dir, nahuel/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long, env = "NAHUEL_DATABASE")]
    database: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "NAHUEL_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "NAHUEL_PORT")]
    port: Option<u16>,

    /// How unknown codes are handled on writes: permissive or strict
    #[arg(long, env = "NAHUEL_CODE_RESOLUTION")]
    code_resolution: Option<CodeResolution>,

    /// Tracing filter directive used when RUST_LOG is unset
    #[arg(long, env = "NAHUEL_LOG")]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            database: self.database.clone(),
            host: self.host.clone(),
            port: self.port,
            code_resolution: self.code_resolution,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is resolved first because it carries the log level
    let (file_config, config_source) = TomlConfig::discover(args.config.as_deref());
    let config = ServiceConfig::resolve(args.overrides(), file_config);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Nahuel catalog service (nahuel-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    config_source.log();
    info!("Database path: {}", config.database_path.display());
    info!("Code resolution: {:?}", config.code_resolution);

    let pool = match init_database(&config.database_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e).context("Database initialization failed");
        }
    };

    let state = AppState::new(pool.clone(), config.code_resolution);
    let app = build_router(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("nahuel-api listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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
