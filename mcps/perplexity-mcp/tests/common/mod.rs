//! Shared helpers: an in-process mock of the Perplexity API

#![allow(dead_code)]

use axum::Router;
use perplexity_mcp::{ConfigSources, SearchDispatcher, Settings};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing listens on
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Settings pointing at a mock upstream at `addr`, plus extra env vars
pub fn settings(addr: SocketAddr, extra_env: &[(&str, &str)]) -> Arc<Settings> {
    let mut sources = ConfigSources::default();
    sources
        .env
        .insert("PERPLEXITY_API_KEY".to_string(), "test-key".to_string());
    sources.env.insert(
        "PERPLEXITY_API_URL".to_string(),
        format!("http://{}/chat/completions", addr),
    );
    for (key, value) in extra_env {
        sources.env.insert(key.to_string(), value.to_string());
    }
    Arc::new(Settings::resolve(&sources).unwrap())
}

pub fn dispatcher(settings: Arc<Settings>) -> SearchDispatcher {
    SearchDispatcher::new(settings).unwrap()
}

/// A chat-completions response body as the API returns it
pub fn completion(content: &str, citations: &[&str]) -> Value {
    json!({
        "id": "cmpl-test",
        "model": "sonar",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "finish_reason": "stop",
            "message": { "role": "assistant", "content": content }
        }],
        "citations": citations,
        "usage": { "prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30 }
    })
}

/// The user message of a recorded request body
pub fn keyword_of(body: &Value) -> String {
    body["messages"][1]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}
