//! Perplexity backend
//!
//! Sends one chat-completions request per search and normalizes the reply.
//! No retries: a failed attempt is reported to the caller as is.
//! See: https://docs.perplexity.ai/api-reference/chat-completions-post

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::SearchBackend;
use crate::config::{ConfigError, Settings};
use crate::error::{truncate, upstream_message, SearchError};
use crate::types::{SearchRequest, SearchResult};

/// Keywords are logged up to this many characters
const LOG_PAYLOAD_CHARS: usize = 500;

/// Answer for a well-formed reply that carries no choices
pub const NO_RESULTS_ANSWER: &str = "No search results found";

/// The search dispatcher
///
/// Holds one pooled HTTP client for all calls; cloning shares the pool.
#[derive(Clone)]
pub struct SearchDispatcher {
    client: Client,
    settings: Arc<Settings>,
    timeout: Duration,
}

impl SearchDispatcher {
    /// Build the HTTP client from resolved settings
    ///
    /// Fails if a proxy URL is rejected by the HTTP client.
    pub fn new(settings: Arc<Settings>) -> Result<Self, ConfigError> {
        let timeout = Duration::try_from_secs_f64(settings.timeout_seconds).map_err(|e| {
            ConfigError::Invalid(vec![format!(
                "timeout_seconds {} is not usable: {}",
                settings.timeout_seconds, e
            )])
        })?;

        let builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        let client = settings
            .proxy
            .apply(builder)
            .and_then(|b| b.build())
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        for (scheme, url) in settings.proxy.routes() {
            tracing::info!(
                "Routing {} requests through proxy {}",
                scheme,
                crate::proxy::redact_proxy_url(url)
            );
        }

        Ok(Self {
            client,
            settings,
            timeout,
        })
    }

    /// Requested model (or the default) with the configured prefix applied once
    fn resolve_model(&self, requested: Option<&str>) -> String {
        let model = requested
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.settings.default_model.as_str());

        let prefix = self.settings.model_prefix.as_str();
        if !prefix.is_empty() && !model.starts_with(prefix) {
            format!("{}{}", prefix, model)
        } else {
            model.to_string()
        }
    }

    fn resolve_system_message<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(self.settings.default_system_message.as_str())
    }
}

// Perplexity API request/response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<Choice>>,
    #[serde(default)]
    citations: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Turn a 2xx body into a [`SearchResult`]
fn parse_completion(body: &str, model: String) -> Result<SearchResult, SearchError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| SearchError::ResponseFormat(format!("unexpected response body: {}", e)))?;

    let choices = parsed
        .choices
        .ok_or_else(|| SearchError::ResponseFormat("missing 'choices' field".to_string()))?;
    let Some(first) = choices.into_iter().next() else {
        tracing::warn!("API returned an empty 'choices' list");
        return Ok(SearchResult {
            answer: NO_RESULTS_ANSWER.to_string(),
            citations: Vec::new(),
            model,
        });
    };
    let answer = first
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| {
            SearchError::ResponseFormat("first choice has no message content".to_string())
        })?;

    Ok(SearchResult {
        answer,
        citations: parsed.citations.unwrap_or_default(),
        model,
    })
}

#[async_trait]
impl SearchBackend for SearchDispatcher {
    fn name(&self) -> &str {
        "perplexity"
    }

    async fn execute(&self, request: SearchRequest) -> Result<SearchResult, SearchError> {
        // Blank check only; the keyword goes upstream as given
        let keyword = request.keyword.as_str();
        if keyword.trim().is_empty() {
            return Err(SearchError::InvalidRequest(
                "keyword must not be empty".to_string(),
            ));
        }

        let model = self.resolve_model(request.model.as_deref());
        let system_message = self.resolve_system_message(request.system_message.as_deref());

        tracing::info!(
            model = %model,
            "Searching Perplexity for: {}",
            truncate(keyword, LOG_PAYLOAD_CHARS)
        );
        tracing::debug!("System message: {}", truncate(system_message, LOG_PAYLOAD_CHARS));

        let body = ChatCompletionRequest {
            model: &model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_message,
                },
                ChatMessage {
                    role: "user",
                    content: keyword,
                },
            ],
        };

        let timeout_seconds = self.settings.timeout_seconds;
        let response = self
            .client
            .post(&self.settings.api_url)
            .bearer_auth(&self.settings.api_key)
            .header(header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::from_transport(e, timeout_seconds))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SearchError::from_transport(e, timeout_seconds))?;

        if !status.is_success() {
            let message = upstream_message(&text);
            tracing::warn!("Perplexity API returned {}: {}", status, message);
            return Err(SearchError::from_status(status.as_u16(), message));
        }

        tracing::debug!("API response status: {}", status);

        let result = parse_completion(&text, model)?;
        tracing::info!(
            "Search finished: {} chars, {} citations",
            result.answer.chars().count(),
            result.citations.len()
        );

        Ok(result)
    }
}
