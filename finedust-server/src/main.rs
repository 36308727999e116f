//! Binary crate for the fine-dust HTTP server.
//!
//! This crate focuses on:
//! - Parsing server arguments and loading configuration
//! - Tracing setup
//! - Exposing the aggregation service over HTTP

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use finedust_core::Config;
use tracing_subscriber::EnvFilter;

mod http;

/// Top-level server arguments.
#[derive(Debug, Parser)]
#[command(name = "finedust-server", version, about = "Fine dust air quality API server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;
    init_tracing(&config.log_level);
    config.validate()?;

    let context = Arc::new(http::AppContext::from_config(&config)?);
    let app = http::router(context);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!("listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

fn init_tracing(level: &str) {
    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
    }
}
