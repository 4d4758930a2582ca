//! Search failure taxonomy
//!
//! Every way a search call can fail ends up as one [`SearchError`] variant.
//! The tool surface turns it into a [`SearchFailure`] payload, so callers
//! always get a stable `kind` tag plus a readable message.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Upstream error bodies are cut to this many characters
const MAX_UPSTREAM_MESSAGE_CHARS: usize = 500;

/// Stable error tags exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    AuthError,
    RateLimitError,
    UpstreamError,
    UnexpectedStatusError,
    TimeoutError,
    NetworkError,
    ResponseFormatError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::AuthError => "auth_error",
            ErrorKind::RateLimitError => "rate_limit_error",
            ErrorKind::UpstreamError => "upstream_error",
            ErrorKind::UnexpectedStatusError => "unexpected_status_error",
            ErrorKind::TimeoutError => "timeout_error",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::ResponseFormatError => "response_format_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    /// Rejected locally, nothing was sent
    #[error("invalid search request: {0}")]
    InvalidRequest(String),

    #[error("Perplexity API rejected the credentials (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Perplexity API rate limit hit (HTTP {status}): {message}")]
    RateLimit { status: u16, message: String },

    #[error("Perplexity API server error (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Perplexity API returned unexpected status HTTP {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("request exceeded {seconds:?}s")]
    Timeout { seconds: f64 },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed Perplexity API response: {0}")]
    ResponseFormat(String),
}

impl SearchError {
    /// Map a non-2xx status to its error variant
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => SearchError::Auth { status, message },
            429 => SearchError::RateLimit { status, message },
            500..=599 => SearchError::Upstream { status, message },
            _ => SearchError::UnexpectedStatus { status, message },
        }
    }

    /// Map a transport failure, keeping timeouts distinct from other I/O
    pub fn from_transport(err: reqwest::Error, timeout_seconds: f64) -> Self {
        if err.is_timeout() {
            SearchError::Timeout {
                seconds: timeout_seconds,
            }
        } else {
            SearchError::Network(error_chain(&err))
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            SearchError::Auth { .. } => ErrorKind::AuthError,
            SearchError::RateLimit { .. } => ErrorKind::RateLimitError,
            SearchError::Upstream { .. } => ErrorKind::UpstreamError,
            SearchError::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatusError,
            SearchError::Timeout { .. } => ErrorKind::TimeoutError,
            SearchError::Network(_) => ErrorKind::NetworkError,
            SearchError::ResponseFormat(_) => ErrorKind::ResponseFormatError,
        }
    }

    /// HTTP status of the upstream response, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            SearchError::Auth { status, .. }
            | SearchError::RateLimit { status, .. }
            | SearchError::Upstream { status, .. }
            | SearchError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Serializable shape handed to the caller
    pub fn failure(&self) -> SearchFailure {
        SearchFailure {
            kind: self.kind(),
            message: self.to_string(),
            status: self.status(),
            timeout_seconds: match self {
                SearchError::Timeout { seconds } => Some(*seconds),
                _ => None,
            },
        }
    }
}

/// Structured failure returned for one search call
#[derive(Debug, Clone, Serialize)]
pub struct SearchFailure {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Configured limit, set for timeout failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<f64>,
}

/// Best human-readable message from an upstream error body
///
/// Prefers `error.message` (OpenAI-style), then `error` / `detail` strings,
/// then the raw text.
pub fn upstream_message(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "(empty response body)".to_string();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let extracted = ["/error/message", "/error", "/detail"]
            .into_iter()
            .find_map(|pointer| value.pointer(pointer).and_then(|v| v.as_str()));
        if let Some(message) = extracted {
            return truncate(message, MAX_UPSTREAM_MESSAGE_CHARS);
        }
    }

    truncate(body, MAX_UPSTREAM_MESSAGE_CHARS)
}

/// Cut `text` to `max_chars` characters, marking the cut
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// `Display` of an error followed by its sources
///
/// reqwest's own message ("error sending request") hides the useful part
/// (connection refused, DNS failure) in the source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
