//! HTTP listener
//!
//! Binds the configured address and serves the application until Ctrl+C.

use crate::config::ServerConfig;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Listener configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Address to bind to (e.g., "127.0.0.1:8080")
    pub bind: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], crate::config::DEFAULT_HTTP_PORT)),
        }
    }
}

impl HttpConfig {
    pub fn new(bind: SocketAddr) -> Self {
        Self { bind }
    }

    /// Create config from host and port strings
    pub fn from_host_port(host: &str, port: u16) -> Result<Self, std::net::AddrParseError> {
        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
        Ok(Self::new(addr))
    }

    pub fn from_server_config(server: &ServerConfig) -> Result<Self, std::net::AddrParseError> {
        Self::from_host_port(&server.host, server.port)
    }
}

/// Start serving in the background
///
/// Returns the bound address (useful with port 0) and the server task.
pub async fn run_http(
    app: Router,
    config: HttpConfig,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(config.bind).await?;
    let addr = listener.local_addr()?;

    info!("HTTP server listening on http://{}", addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "HTTP server error");
        }
    });

    Ok((addr, handle))
}

/// Serve and wait for a shutdown signal (Ctrl+C)
pub async fn run_http_blocking(app: Router, config: HttpConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind).await?;
    info!("HTTP server listening on http://{}", listener.local_addr()?);
    info!("Press Ctrl+C to stop the server");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Received shutdown signal");
        })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
