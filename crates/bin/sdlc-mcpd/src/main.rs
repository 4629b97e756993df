//! Daemon entry point for the SDLC Assist MCP server.
//!
//! Loads configuration from flags and the environment, installs logging on
//! stderr, builds the lazy service registry, and serves MCP over stdio or
//! streamable HTTP.

mod config;
mod registry;

use std::sync::Arc;

use sdlc_mcp::server::{serve_stdio, serve_streamable_http};
use sdlc_store::catalog;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{SdlcConfig, Transport};
use crate::registry::build_registry;

const DEFAULT_LOG_FILTER: &str = "info";

fn init_tracing() {
    // stdout carries the stdio transport, so logs go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();
    let config = SdlcConfig::from_args()?;
    catalog::validate()?;

    let registry = Arc::new(build_registry(&config));
    match config.transport {
        Transport::Stdio => {
            info!("serving MCP over stdio");
            serve_stdio(registry).await
        }
        Transport::StreamableHttp => serve_streamable_http(registry, config.http_config()).await,
    }
}
