//! depot server binary.

use anyhow::{Context, Result};
use clap::Parser;
use depot_core::config::AppConfig;
use depot_server::{AppState, create_router};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// depot - distributed artifact storage server
#[derive(Parser, Debug)]
#[command(name = "depotd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "DEPOT_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Load configuration from an optional TOML file and `DEPOT_` environment variables.
fn load_config(path: &str) -> Result<AppConfig> {
    let config_path = std::path::Path::new(path);
    let mut figment = Figment::new();
    let has_config_file = config_path.exists();

    if has_config_file {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", path);
    }

    // DEPOT_CONFIG only names the file.
    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with("DEPOT_") && key != "DEPOT_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: depotd --config /path/to/config.toml\n  \
             2. Environment variables: DEPOT_SERVER__BIND=0.0.0.0:8080 \
             DEPOT_METADATA__TYPE=sqlite \
             DEPOT_METADATA__PATH=/var/lib/depot/metadata.db depotd\n\n\
             See config/server.example.toml for example configuration.\n\
             Set DEPOT_CONFIG env var to specify a default config file path."
        );
    }

    if !has_config_file {
        tracing::info!("Using environment variables for configuration");
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("DEPOT_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("depot v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    depot_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let metadata = depot_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    metadata
        .health_check()
        .await
        .context("metadata store health check failed")?;
    tracing::info!("Metadata store initialized");

    let transfer = depot_storage::from_config(&config, metadata.clone())
        .context("failed to initialize transfer server")?;
    for category in transfer.index().router().categories() {
        tracing::info!(
            category = %category,
            volumes = transfer.index().router().roots(category).map_or(0, |r| r.len()),
            indexed = transfer.index().router().is_indexed(category),
            "Category configured"
        );
    }

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    let state = AppState::new(config, metadata, transfer);
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
