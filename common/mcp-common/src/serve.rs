//! Transport bindings for MCP servers
//!
//! Two ways to put a `ServerHandler` on the wire:
//! - [`serve_stdio`]: one client over stdin/stdout
//! - [`serve_streamable_http`]: Streamable HTTP (POST + SSE) on a TCP socket,
//!   one server instance per session

use anyhow::Result;
use rmcp::{
    transport::{
        stdio,
        streamable_http_server::{
            session::local::LocalSessionManager, StreamableHttpServerConfig,
            StreamableHttpService,
        },
    },
    ServerHandler, ServiceExt,
};
use tower_http::limit::RequestBodyLimitLayer;

/// Where and how the Streamable HTTP endpoint listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpBinding {
    pub host: String,
    pub port: u16,
    /// Endpoint path, e.g. `/mcp`
    pub path: String,
    /// Maximum accepted request body in bytes
    pub body_limit: usize,
}

impl HttpBinding {
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.path)
    }
}

/// Serve over stdio until the client disconnects
pub async fn serve_stdio<S>(server: S) -> Result<()>
where
    S: ServerHandler,
{
    let service = server.serve(stdio()).await?;

    tracing::info!("Server running on stdio, waiting for requests...");
    service.waiting().await?;

    tracing::info!("Server shutting down");
    Ok(())
}

/// Serve over Streamable HTTP until Ctrl-C
///
/// Each MCP session gets a clone of `server`, so shared state must live
/// behind `Arc`s inside it.
pub async fn serve_streamable_http<S>(server: S, binding: &HttpBinding) -> Result<()>
where
    S: ServerHandler + Clone + Send + Sync + 'static,
{
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    // axum refuses to nest at the root
    let router = if binding.path == "/" {
        axum::Router::new().fallback_service(service)
    } else {
        axum::Router::new().nest_service(&binding.path, service)
    };
    let router = router.layer(RequestBodyLimitLayer::new(binding.body_limit));

    let listener = tokio::net::TcpListener::bind((binding.host.as_str(), binding.port)).await?;
    tracing::info!("Server listening on {}", binding.endpoint());

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
