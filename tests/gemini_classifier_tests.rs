mod common;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use inkpost::BlogError;
use inkpost::service::classifier::GeminiClassifier;
use inkpost::service::{CommentClassifier, ModerationVerdict};
use serde_json::{Value, json};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use tokio::net::TcpListener;
use url::Url;

const API_KEY: &str = "test-gemini-key";

/// Scripted upstream: answers the n-th call with `script[n]` (last entry repeats).
#[derive(Clone)]
struct FakeGemini {
    script: Arc<Vec<(StatusCode, Value)>>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl FakeGemini {
    fn new(script: Vec<(StatusCode, Value)>) -> Self {
        Self {
            script: Arc::new(script),
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn serve(&self) -> Url {
        let app = Router::new()
            .route("/v1beta/models/{rpc}", post(generate))
            .with_state(self.clone());
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake upstream");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Url::parse(&format!(
            "http://{addr}/v1beta/models/gemini-test:generateContent"
        ))
        .expect("fake upstream url")
    }
}

async fn generate(
    State(fake): State<FakeGemini>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let n = fake.calls.fetch_add(1, Ordering::SeqCst);
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    fake.seen.lock().unwrap().push((key, body));
    let idx = n.min(fake.script.len() - 1);
    let (status, payload) = fake.script[idx].clone();
    (status, Json(payload)).into_response()
}

fn answer(text: &str) -> (StatusCode, Value) {
    (
        StatusCode::OK,
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}),
    )
}

fn classifier(url: Url, retries: usize) -> GeminiClassifier {
    GeminiClassifier::new(reqwest::Client::new(), url, API_KEY, 600, retries)
}

#[tokio::test]
async fn safe_answer_is_safe_and_request_is_well_formed() {
    let fake = FakeGemini::new(vec![answer("safe")]);
    let url = fake.serve().await;

    let verdict = classifier(url, 0)
        .classify("What a lovely post")
        .await
        .unwrap();
    assert_eq!(verdict, ModerationVerdict::Safe);
    assert_eq!(fake.calls(), 1);

    let seen = fake.seen.lock().unwrap();
    let (key, body) = &seen[0];
    assert_eq!(key.as_deref(), Some(API_KEY));
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("What a lovely post"));
}

#[tokio::test]
async fn needs_review_answer_flags() {
    let fake = FakeGemini::new(vec![answer("needs_review")]);
    let url = fake.serve().await;

    let verdict = classifier(url, 0).classify("offensive").await.unwrap();
    assert_eq!(verdict, ModerationVerdict::NeedsReview);
}

#[tokio::test]
async fn server_errors_are_retried() {
    let fake = FakeGemini::new(vec![
        (StatusCode::SERVICE_UNAVAILABLE, json!({})),
        answer("needs_review"),
    ]);
    let url = fake.serve().await;

    let verdict = classifier(url, 2).classify("x").await.unwrap();
    assert_eq!(verdict, ModerationVerdict::NeedsReview);
    assert_eq!(fake.calls(), 2);
}

#[tokio::test]
async fn persistent_server_errors_give_up() {
    let fake = FakeGemini::new(vec![(StatusCode::INTERNAL_SERVER_ERROR, json!({}))]);
    let url = fake.serve().await;

    let err = classifier(url, 1).classify("x").await.unwrap_err();
    assert!(matches!(err, BlogError::Reqwest(_)), "{err:?}");
    assert_eq!(fake.calls(), 2);
}

#[tokio::test]
async fn client_errors_are_not_retried_and_decode_gemini_envelope() {
    let fake = FakeGemini::new(vec![(
        StatusCode::BAD_REQUEST,
        json!({"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}),
    )]);
    let url = fake.serve().await;

    let err = classifier(url, 3).classify("x").await.unwrap_err();
    match err {
        BlogError::GeminiServerError(e) => assert_eq!(e.error.status, "INVALID_ARGUMENT"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fake.calls(), 1);
}

#[tokio::test]
async fn missing_candidates_is_an_error() {
    let fake = FakeGemini::new(vec![(
        StatusCode::OK,
        json!({"promptFeedback": {"blockReason": "SAFETY"}}),
    )]);
    let url = fake.serve().await;

    let err = classifier(url, 0).classify("x").await.unwrap_err();
    assert!(matches!(err, BlogError::EmptyModeration));
}

#[tokio::test]
async fn comments_are_flagged_end_to_end() {
    let fake = FakeGemini::new(vec![answer("needs_review")]);
    let url = fake.serve().await;

    let t = common::spawn_app("gemini-e2e", Arc::new(classifier(url, 0))).await;
    let post = t
        .storage
        .create_post("Post", "Body", Utc::now())
        .await
        .unwrap();

    let (status, data) = t
        .post_json(
            "/api/comments/",
            json!({"post_id": post.id, "author_name": "x", "text": "rude words"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(data["flagged"], true);

    let (_, queue) = t.get("/api/comments/flagged/").await;
    assert_eq!(queue.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unreachable_upstream_fails_open_end_to_end() {
    // nothing listens on the discard port
    let url = Url::parse("http://127.0.0.1:9/v1beta/models/m:generateContent").unwrap();
    let t = common::spawn_app("gemini-down", Arc::new(classifier(url, 0))).await;
    let post = t
        .storage
        .create_post("Post", "Body", Utc::now())
        .await
        .unwrap();

    let (status, data) = t
        .post_json(
            "/api/comments/",
            json!({"post_id": post.id, "author_name": "x", "text": "hello"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(data["flagged"], false);
}
