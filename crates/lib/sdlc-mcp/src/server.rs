//! MCP server runners for sdlc-assist-mcp.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use rmcp::serve_server;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig,
    StreamableHttpService,
    session::local::LocalSessionManager,
};
use sdlc_core::services::ServiceRegistry;
use tracing::info;

use crate::SdlcMcp;

pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Configuration for the MCP streamable HTTP server.
#[derive(Debug, Clone)]
pub struct McpHttpServerConfig {
    pub addr: SocketAddr,
    pub stateful_mode: bool,
    pub sse_keep_alive: Option<Duration>,
    pub sse_retry: Option<Duration>,
}

impl McpHttpServerConfig {
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            stateful_mode: true,
            sse_keep_alive: Some(Duration::from_secs(15)),
            sse_retry: Some(Duration::from_secs(3)),
        }
    }

    #[must_use]
    pub const fn with_stateful_mode(mut self, stateful_mode: bool) -> Self {
        self.stateful_mode = stateful_mode;
        self
    }
}

impl Default for McpHttpServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_HTTP_PORT)))
    }
}

/// Serves the MCP server over stdio.
///
/// # Errors
/// Returns any transport or server error.
pub async fn serve_stdio(
    registry: Arc<ServiceRegistry>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let service = SdlcMcp::with_registry(registry);
    let (stdin, stdout) = stdio();
    let running = serve_server(service, (stdin, stdout)).await?;
    let _ = running.waiting().await?;
    info!("stdio session ended");
    Ok(())
}

/// Builds the axum router hosting the MCP service at `/mcp` and a plain
/// `/health` liveness check.
pub fn http_router(registry: Arc<ServiceRegistry>, config: &McpHttpServerConfig) -> Router {
    let service: StreamableHttpService<SdlcMcp, LocalSessionManager> = StreamableHttpService::new(
        move || Ok(SdlcMcp::with_registry(registry.clone())),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            sse_keep_alive: config.sse_keep_alive,
            sse_retry: config.sse_retry,
            stateful_mode: config.stateful_mode,
            ..Default::default()
        },
    );

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest_service("/mcp", service)
}

/// Serves the MCP server using streamable HTTP transport.
///
/// # Errors
/// Returns any listener or server error.
pub async fn serve_streamable_http(
    registry: Arc<ServiceRegistry>,
    config: McpHttpServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = http_router(registry, &config);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "serving MCP over streamable HTTP");
    axum::serve(listener, app).await?;
    Ok(())
}
