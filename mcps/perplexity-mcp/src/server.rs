//! MCP Server implementation for Perplexity search
//!
//! Exposes a single `search` tool. Search failures come back as tool results
//! with `is_error` set and a `{kind, message, status}` payload; they never
//! take the server down.

use mcp_common::{
    async_trait, failure_result, text_success, EmbeddableError, EmbeddableMcp,
    EmbeddableResult,
};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo, Tool},
    tool, tool_handler, tool_router, ErrorData as McpError,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::backends::{SearchBackend, SearchDispatcher};
use crate::config::{ConfigError, Settings};
use crate::types::SearchRequest;

/// The main Perplexity MCP Server
#[derive(Clone)]
pub struct PerplexityMcpServer {
    backend: Arc<dyn SearchBackend>,
    tool_router: ToolRouter<Self>,
}

// ============================================================================
// Parameter Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Search keyword or question
    #[schemars(description = "Search keyword or question; natural-language queries work best")]
    pub keyword: String,
    /// Model override
    #[schemars(
        description = "Model name (optional): sonar (balanced), sonar-pro (deeper analysis), \
                       sonar-reasoning, sonar-reasoning-pro, sonar-deep-research. \
                       Defaults to the configured model"
    )]
    pub model: Option<String>,
    /// System prompt override
    #[schemars(
        description = "System prompt (optional) guiding answer style and format. \
                       Defaults to the configured system message"
    )]
    pub system_message: Option<String>,
}

impl From<SearchParams> for SearchRequest {
    fn from(params: SearchParams) -> Self {
        SearchRequest {
            keyword: params.keyword,
            model: params.model,
            system_message: params.system_message,
        }
    }
}

// ============================================================================
// Tool Router Implementation
// ============================================================================

#[tool_router]
impl PerplexityMcpServer {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        tracing::info!("Using {} search backend", backend.name());
        Self {
            backend,
            tool_router: Self::tool_router(),
        }
    }

    /// Server backed by the Perplexity dispatcher
    pub fn from_settings(settings: Arc<Settings>) -> Result<Self, ConfigError> {
        let dispatcher = SearchDispatcher::new(settings)?;
        Ok(Self::new(Arc::new(dispatcher)))
    }

    #[tool(
        description = "Search the internet with Perplexity AI. Returns an answer followed by \
                       numbered citation URLs."
    )]
    async fn search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        self.run_search(params.into()).await
    }

    /// Execute a search and shape the outcome as a tool result
    pub async fn run_search(&self, request: SearchRequest) -> Result<CallToolResult, McpError> {
        match self.backend.execute(request).await {
            Ok(result) => Ok(text_success(result.render())),
            Err(e) => {
                tracing::warn!(kind = %e.kind(), "Search failed: {}", e);
                failure_result(&e.failure())
            }
        }
    }
}

// ============================================================================
// Server Handler Implementation
// ============================================================================

#[tool_handler]
impl rmcp::ServerHandler for PerplexityMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Perplexity Search MCP Server - answers questions with live web search \
                 via Perplexity AI. Use the `search` tool; results include numbered \
                 citations."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ============================================================================
// In-process access
// ============================================================================

#[async_trait]
impl EmbeddableMcp for PerplexityMcpServer {
    fn server_name(&self) -> &str {
        "perplexity"
    }

    fn list_tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult> {
        match name {
            "search" => {
                let params: SearchParams = serde_json::from_value(params)
                    .map_err(|e| EmbeddableError::InvalidParams(e.to_string()))?;
                Ok(self.run_search(params.into()).await?)
            }
            other => Err(EmbeddableError::ToolNotFound(other.to_string())),
        }
    }

    fn server_version(&self) -> Option<&str> {
        Some(env!("CARGO_PKG_VERSION"))
    }
}
