//! Result helpers for MCP tool responses

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

use crate::error::{McpResult, ResultExt};

/// Create a successful plain text response
pub fn text_success(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

/// Create a tool-level failure carrying a serializable payload
///
/// The result has `is_error` set, so the client sees a failed call, but the
/// exchange itself succeeds: the server keeps serving other requests and the
/// payload (usually `{kind, message}`) stays machine-readable.
///
/// ```rust,ignore
/// Err(e) => failure_result(&e.failure()),
/// ```
pub fn failure_result<T: Serialize>(payload: &T) -> McpResult<CallToolResult> {
    let json = serde_json::to_string_pretty(payload).to_mcp_err()?;
    Ok(CallToolResult::error(vec![Content::text(json)]))
}
