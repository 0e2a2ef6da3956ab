//! # DMS Proxy Entry Point
//!
//! The main executable for the gateway. This file drives the process lifecycle:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and installs logging.
//! 2. **Schema**: Reads the descriptor set and builds the gateway. Any failure here aborts
//!    the process before a single connection is accepted.
//! 3. **Serving**: Binds the listener and serves until Ctrl+C or SIGTERM.
mod cli;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use dms_core::Gateway;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dms_core=info,dms_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Cli::parse();
    let config = args.gateway_config();

    let schema = std::fs::read(&args.descriptor_set).with_context(|| {
        format!(
            "Failed to read descriptor set '{}'",
            args.descriptor_set.display()
        )
    })?;

    let gateway = Gateway::new(&schema, config.clone()).context("Failed to build the gateway")?;

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind '{}'", config.bind))?;

    gateway.serve(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
