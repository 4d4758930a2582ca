//! MCP Common - Shared utilities for MCP servers
//!
//! This crate provides the plumbing every MCP server in the workspace needs:
//!
//! - **Initialization**: [`init_tracing`] for stderr logging
//! - **Transports**: [`serve_stdio`] and [`serve_streamable_http`]
//! - **Results**: Helpers for building `CallToolResult` responses, including
//!   structured tool failures
//! - **Errors**: Traits for converting errors to MCP-compatible format
//! - **Embeddable**: [`EmbeddableMcp`] trait for in-process execution
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_common::{init_tracing, serve_stdio, text_success};
//!
//! init_tracing("my_mcp", "info")?;
//! serve_stdio(MyServer::new()).await?;
//! ```

pub mod embeddable;
pub mod error;
pub mod init;
pub mod result;
pub mod serve;

// Re-export commonly used items at crate root
pub use embeddable::{EmbeddableError, EmbeddableMcp, EmbeddableResult};
pub use error::{IntoMcpError, McpResult, ResultExt};
pub use init::init_tracing;
pub use result::{failure_result, text_success};
pub use serve::{serve_stdio, serve_streamable_http, HttpBinding};

// Re-export rmcp types that are commonly needed
pub use rmcp::{
    model::{CallToolResult, Content, Tool},
    ErrorData as McpError,
};

// Re-export async_trait for implementing EmbeddableMcp
pub use async_trait::async_trait;
