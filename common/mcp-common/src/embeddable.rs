//! Embeddable MCP trait for in-process execution
//!
//! [`EmbeddableMcp`] exposes a server's tool registry directly: callers list
//! the registered tools and invoke one by name with JSON arguments, without
//! going through a transport.
//!
//! ```rust,ignore
//! use mcp_common::EmbeddableMcp;
//!
//! let tools = server.list_tools();
//! let result = server
//!     .call_tool("search", serde_json::json!({ "keyword": "rust async" }))
//!     .await?;
//! ```

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Tool};
use serde_json::Value;

/// Error type for embeddable MCP operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddableError {
    /// No tool with this name is registered
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// The arguments do not match the tool's input schema
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// MCP protocol error raised by the tool handler
    #[error("mcp error: {0}")]
    McpError(String),
}

impl From<rmcp::ErrorData> for EmbeddableError {
    fn from(err: rmcp::ErrorData) -> Self {
        EmbeddableError::McpError(err.message.to_string())
    }
}

/// Result type for embeddable MCP operations
pub type EmbeddableResult<T> = Result<T, EmbeddableError>;

/// Trait for MCP servers that can be executed in-process
///
/// Implementations must be `Send + Sync`; tool calls may run concurrently
/// from several tasks.
#[async_trait]
pub trait EmbeddableMcp: Send + Sync {
    /// Server name, matching the name used in MCP client configuration
    fn server_name(&self) -> &str;

    /// All registered tools with their input schemas
    fn list_tools(&self) -> Vec<Tool>;

    /// Execute a tool by name
    ///
    /// A tool-level failure (e.g. the upstream API rejected the request) is
    /// an `Ok` result with `is_error` set. `Err` is reserved for unknown
    /// tools, bad arguments, and protocol errors.
    async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult>;

    fn server_version(&self) -> Option<&str> {
        None
    }
}
