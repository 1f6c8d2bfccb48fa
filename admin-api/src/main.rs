//! admin-api - Content administration backend
//!
//! Serves create/list endpoints for blogs, courses, testimonials and jobs,
//! course update/delete, health and status probes, and a websocket event
//! feed. The backing store (direct SQL or a managed REST API) is selected
//! by configuration at startup.

use admin_api::{build_router, AppState};
use admin_common::config::{AdminConfig, StoreConfig};
use admin_common::store::build_store;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Sql,
    Rest,
}

#[derive(Debug, Parser)]
#[command(name = "admin-api", version, about = "Content administration backend")]
struct Args {
    /// Path to TOML config file (overrides ADMIN_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long, env = "ADMIN_HOST")]
    host: Option<String>,

    /// Listen port
    #[arg(short, long, env = "ADMIN_PORT")]
    port: Option<u16>,

    /// Force a backend variant; must agree with the configured store
    #[arg(long, value_enum)]
    backend: Option<Backend>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Build identification first, before any store delays
    info!(
        "Starting admin-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let config = load_config(&args)?;
    info!("Store: {}", config.store.describe());

    let store = match build_store(&config.store, &config.timeouts).await {
        Ok(store) => {
            info!("✓ Persistence gateway ready ({})", store.backend_name());
            store
        }
        Err(e) => {
            error!("Failed to initialise store: {}", e);
            return Err(e.into());
        }
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(store, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("admin-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);
    info!("Event feed: ws://{}/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("admin-api stopped");
    Ok(())
}

fn load_config(args: &Args) -> Result<AdminConfig> {
    let mut config = AdminConfig::load(args.config.as_deref())?;
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(backend) = args.backend {
        let configured = matches!(
            (&config.store, backend),
            (StoreConfig::Sql { .. }, Backend::Sql) | (StoreConfig::Rest { .. }, Backend::Rest)
        );
        if !configured {
            anyhow::bail!(
                "--backend {:?} requested but configuration selects {}",
                backend,
                config.store.backend_name()
            );
        }
    }
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
