//! Search backend abstraction
//!
//! The MCP server talks to a [`SearchBackend`]; the production implementation
//! is the Perplexity [`SearchDispatcher`].

use async_trait::async_trait;

use crate::error::SearchError;
use crate::types::{SearchRequest, SearchResult};

pub mod perplexity;

pub use perplexity::SearchDispatcher;

/// A backend that answers one search request at a time
///
/// Implementations are stateless per call: concurrent `execute` calls must
/// not depend on or block each other.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Get the name of this backend
    fn name(&self) -> &str;

    /// Run one search; every failure is a [`SearchError`]
    async fn execute(&self, request: SearchRequest) -> Result<SearchResult, SearchError>;
}
