mod common;

use axum::{
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use common::{closed_addr, completion, dispatcher, keyword_of, serve, settings};
use perplexity_mcp::backends::perplexity::NO_RESULTS_ANSWER;
use perplexity_mcp::{ErrorKind, SearchBackend, SearchError, SearchRequest};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Upstream that always answers with `status` and `body`
fn fixed_upstream(status: StatusCode, body: Value) -> Router {
    Router::new().route(
        "/chat/completions",
        post(move || {
            let body = body.clone();
            async move { (status, Json(body)) }
        }),
    )
}

#[tokio::test]
async fn search_sends_bearer_auth_and_chat_body() {
    let seen: Arc<Mutex<Vec<(Option<String>, Value)>>> = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().route(
        "/chat/completions",
        post({
            let seen = seen.clone();
            move |headers: HeaderMap, Json(body): Json<Value>| {
                let seen = seen.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    seen.lock().unwrap().push((auth, body));
                    Json(completion("Rust is a systems language.", &["https://rust-lang.org"]))
                }
            }
        }),
    );
    let addr = serve(app).await;
    let d = dispatcher(settings(addr, &[]));

    let result = d.execute(SearchRequest::new("what is rust")).await.unwrap();
    assert_eq!(result.answer, "Rust is a systems language.");
    assert_eq!(result.citations, vec!["https://rust-lang.org"]);
    assert_eq!(result.model, "sonar");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (auth, body) = &seen[0];
    assert_eq!(auth.as_deref(), Some("Bearer test-key"));
    assert_eq!(body["model"], "sonar");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "Be precise and concise.");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "what is rust");
}

#[tokio::test]
async fn request_overrides_and_model_prefix_reach_the_wire() {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().route(
        "/chat/completions",
        post({
            let seen = seen.clone();
            move |Json(body): Json<Value>| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(body);
                    Json(completion("ok", &[]))
                }
            }
        }),
    );
    let addr = serve(app).await;
    let d = dispatcher(settings(addr, &[("PERPLEXITY_MODEL_PREFIX", "perplexity/")]));

    let result = d
        .execute(
            SearchRequest::new("compare tokio and async-std")
                .with_model("sonar-pro")
                .with_system_message("Answer in one sentence."),
        )
        .await
        .unwrap();
    assert_eq!(result.model, "perplexity/sonar-pro");

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0]["model"], "perplexity/sonar-pro");
    assert_eq!(seen[0]["messages"][0]["content"], "Answer in one sentence.");
}

#[tokio::test]
async fn citations_keep_upstream_order_and_duplicates() {
    let citations = [
        "https://b.example/2",
        "https://a.example/1",
        "https://b.example/2",
    ];
    let addr = serve(fixed_upstream(
        StatusCode::OK,
        completion("answer", &citations),
    ))
    .await;
    let d = dispatcher(settings(addr, &[]));

    let result = d.execute(SearchRequest::new("ordering")).await.unwrap();
    assert_eq!(result.citations, citations);
    assert_eq!(
        result.render(),
        "answer\n\nCitations:\n[1] https://b.example/2\n[2] https://a.example/1\n[3] https://b.example/2\n"
    );
}

#[tokio::test]
async fn missing_citations_yield_empty_list() {
    let body = json!({
        "choices": [{ "message": { "role": "assistant", "content": "plain answer" } }]
    });
    let addr = serve(fixed_upstream(StatusCode::OK, body)).await;
    let d = dispatcher(settings(addr, &[]));

    let result = d.execute(SearchRequest::new("no sources")).await.unwrap();
    assert_eq!(result.answer, "plain answer");
    assert!(result.citations.is_empty());
    assert_eq!(result.render(), "plain answer");
}

#[tokio::test]
async fn http_statuses_map_to_error_kinds() {
    let cases = [
        (StatusCode::UNAUTHORIZED, ErrorKind::AuthError),
        (StatusCode::FORBIDDEN, ErrorKind::AuthError),
        (StatusCode::TOO_MANY_REQUESTS, ErrorKind::RateLimitError),
        (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::UpstreamError),
        (StatusCode::BAD_GATEWAY, ErrorKind::UpstreamError),
        (StatusCode::SERVICE_UNAVAILABLE, ErrorKind::UpstreamError),
        (StatusCode::NOT_FOUND, ErrorKind::UnexpectedStatusError),
        (StatusCode::BAD_REQUEST, ErrorKind::UnexpectedStatusError),
    ];

    for (status, kind) in cases {
        let body = json!({ "error": { "message": format!("upstream said {}", status.as_u16()) } });
        let addr = serve(fixed_upstream(status, body)).await;
        let d = dispatcher(settings(addr, &[]));

        let err = d.execute(SearchRequest::new("status")).await.unwrap_err();
        assert_eq!(err.kind(), kind, "status {}", status);
        assert_eq!(err.status(), Some(status.as_u16()));

        let failure = err.failure();
        assert_eq!(failure.status, Some(status.as_u16()));
        assert!(
            failure
                .message
                .contains(&format!("upstream said {}", status.as_u16())),
            "{}",
            failure.message
        );
    }
}

#[tokio::test]
async fn rate_limit_failure_serializes_with_kind_and_status() {
    let addr = serve(fixed_upstream(
        StatusCode::TOO_MANY_REQUESTS,
        json!({ "error": { "message": "Rate limit exceeded" } }),
    ))
    .await;
    let d = dispatcher(settings(addr, &[]));

    let err = d.execute(SearchRequest::new("busy")).await.unwrap_err();
    let payload = serde_json::to_value(err.failure()).unwrap();
    assert_eq!(payload["kind"], "rate_limit_error");
    assert_eq!(payload["status"], 429);
    assert!(payload["message"]
        .as_str()
        .unwrap()
        .contains("Rate limit exceeded"));
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(completion("too late", &[]))
        }),
    );
    let addr = serve(app).await;
    let d = dispatcher(settings(addr, &[("PERPLEXITY_TIMEOUT", "0.2")]));

    let started = Instant::now();
    let err = d.execute(SearchRequest::new("slow")).await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(3));

    match &err {
        SearchError::Timeout { seconds } => assert_eq!(*seconds, 0.2),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(err.kind(), ErrorKind::TimeoutError);
    assert_eq!(err.status(), None);
    assert!(err.to_string().contains("0.2"));
    assert_eq!(err.failure().timeout_seconds, Some(0.2));
}

#[tokio::test]
async fn connection_refused_is_network_error() {
    let addr = closed_addr().await;
    let d = dispatcher(settings(addr, &[]));

    let err = d.execute(SearchRequest::new("offline")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkError);
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn malformed_success_body_is_response_format_error() {
    let app = Router::new().route("/chat/completions", post(|| async { "<html>oops</html>" }));
    let addr = serve(app).await;
    let d = dispatcher(settings(addr, &[]));

    let err = d.execute(SearchRequest::new("broken")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResponseFormatError);

    let addr = serve(fixed_upstream(StatusCode::OK, json!({ "id": "no choices" }))).await;
    let d = dispatcher(settings(addr, &[]));
    let err = d.execute(SearchRequest::new("missing")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResponseFormatError);
}

#[tokio::test]
async fn empty_choices_answer_no_results() {
    let addr = serve(fixed_upstream(
        StatusCode::OK,
        json!({ "choices": [], "citations": [] }),
    ))
    .await;
    let d = dispatcher(settings(addr, &[]));

    let result = d.execute(SearchRequest::new("obscure")).await.unwrap();
    assert_eq!(result.answer, NO_RESULTS_ANSWER);
    assert!(result.citations.is_empty());
}

#[tokio::test]
async fn keyword_is_sent_verbatim() {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().route(
        "/chat/completions",
        post({
            let seen = seen.clone();
            move |Json(body): Json<Value>| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(body);
                    Json(completion("ok", &[]))
                }
            }
        }),
    );
    let addr = serve(app).await;
    let d = dispatcher(settings(addr, &[]));

    d.execute(SearchRequest::new("  line one\nline two\n"))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(keyword_of(&seen[0]), "  line one\nline two\n");
}

#[tokio::test]
async fn empty_keyword_never_reaches_upstream() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new().route(
        "/chat/completions",
        post({
            let hits = hits.clone();
            move || {
                hits.fetch_add(1, Ordering::SeqCst);
                async { Json(completion("unexpected", &[])) }
            }
        }),
    );
    let addr = serve(app).await;
    let d = dispatcher(settings(addr, &[]));

    for keyword in ["", "  ", "\n\t "] {
        let err = d.execute(SearchRequest::new(keyword)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn slow_search_does_not_block_fast_search() {
    let app = Router::new().route(
        "/chat/completions",
        post(|Json(body): Json<Value>| async move {
            let keyword = keyword_of(&body);
            if keyword.contains("slow") {
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
            Json(completion(&format!("answer for {}", keyword), &[]))
        }),
    );
    let addr = serve(app).await;
    let d = Arc::new(dispatcher(settings(addr, &[])));

    let slow = tokio::spawn({
        let d = d.clone();
        async move { d.execute(SearchRequest::new("slow question")).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let fast = tokio::time::timeout(
        Duration::from_secs(2),
        d.execute(SearchRequest::new("fast question")),
    )
    .await
    .expect("fast search waited on the slow one")
    .unwrap();
    assert_eq!(fast.answer, "answer for fast question");
    assert!(!slow.is_finished());

    let slow = slow.await.unwrap().unwrap();
    assert_eq!(slow.answer, "answer for slow question");
}

#[tokio::test]
async fn in_flight_search_can_be_cancelled() {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Json(completion("never", &[]))
        }),
    );
    let addr = serve(app).await;
    let d = Arc::new(dispatcher(settings(addr, &[])));

    let handle = tokio::spawn({
        let d = d.clone();
        async move { d.execute(SearchRequest::new("abandoned")).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.abort();

    let joined = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("aborted search did not stop");
    assert!(joined.unwrap_err().is_cancelled());
}
