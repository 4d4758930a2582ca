//! Perplexity MCP Library
//!
//! Internet search via the Perplexity AI chat-completions API, exposed as a
//! single MCP `search` tool with numbered citations.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use perplexity_mcp::{PerplexityMcpServer, Settings};
//! use std::sync::Arc;
//!
//! let settings = Arc::new(Settings::load(None)?);
//! let server = PerplexityMcpServer::from_settings(settings)?;
//! // Serve via Streamable HTTP or stdio, or call tools in-process
//! ```
//!
//! # Configuration
//! Set `PERPLEXITY_API_KEY` (required) or configure it in
//! `./perplexity-mcp.toml`, `./config.json`, or `~/.perplexity-mcp/config.toml`.
//! Environment variables override file values field by field.

pub mod backends;
pub mod config;
pub mod error;
pub mod proxy;
pub mod server;
pub mod types;

// Re-export main server type
pub use server::{PerplexityMcpServer, SearchParams};

pub use backends::{SearchBackend, SearchDispatcher};
pub use config::{ConfigError, ConfigSources, EmptyFileValue, Settings};
pub use error::{ErrorKind, SearchError, SearchFailure};
pub use proxy::ProxySettings;
pub use types::{SearchRequest, SearchResult};
