#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode},
};
use inkpost::db::BlogStorage;
use inkpost::service::{CommentClassifier, ModerationVerdict, Moderator};
use inkpost::{BlogError, BlogState, HttpOptions, blog_router};
use serde_json::Value;
use std::{
    fs,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;

pub const ADMIN_KEY: &str = "admin-secret";

/// Classifier with a fixed answer that counts how often it was asked.
pub struct StubClassifier {
    answer: Option<ModerationVerdict>,
    calls: AtomicUsize,
}

impl StubClassifier {
    pub fn answering(verdict: ModerationVerdict) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(verdict),
            calls: AtomicUsize::new(0),
        })
    }

    /// Simulates the upstream API being down.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommentClassifier for StubClassifier {
    async fn classify(&self, _text: &str) -> Result<ModerationVerdict, BlogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .ok_or(BlogError::UpstreamStatus(StatusCode::INTERNAL_SERVER_ERROR))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

pub fn temp_db_path(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!(
        "inkpost-{tag}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    temp_path
}

pub struct TestApp {
    pub app: Router,
    pub storage: BlogStorage,
    db_path: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = fs::remove_file(format!("{}{suffix}", self.db_path.display()));
        }
    }
}

pub async fn spawn_app(tag: &str, classifier: Arc<dyn CommentClassifier>) -> TestApp {
    spawn_app_with(tag, classifier, HttpOptions::default()).await
}

pub async fn spawn_app_with(
    tag: &str,
    classifier: Arc<dyn CommentClassifier>,
    opts: HttpOptions,
) -> TestApp {
    spawn_app_with_admin(tag, classifier, opts, Some(ADMIN_KEY)).await
}

pub async fn spawn_app_with_admin(
    tag: &str,
    classifier: Arc<dyn CommentClassifier>,
    opts: HttpOptions,
    admin_key: Option<&str>,
) -> TestApp {
    let db_path = temp_db_path(tag);
    let database_url = format!("sqlite:{}", db_path.display());
    let storage = inkpost::db::connect(&database_url)
        .await
        .expect("failed to open test database");

    let moderator = Moderator::new(classifier, Duration::from_secs(5));
    let state = BlogState::new(storage.clone(), moderator).with_admin_key(admin_key);
    let app = blog_router(state, &opts);

    TestApp {
        app,
        storage,
        db_path,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<String>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let (status, _, json) = self.send(method, uri, body, headers).await;
        (status, json)
    }

    /// Like [`TestApp::request`] but also returns the response headers.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<String>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let req = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .expect("failed to build request");

        let resp = self.app.clone().oneshot(req).await.expect("request failed");
        let status = resp.status();
        let resp_headers = resp.headers().clone();
        let bytes = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body was not JSON")
        };
        (status, resp_headers, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request("GET", uri, None, &[]).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, Some(body.to_string()), &[]).await
    }

    pub async fn as_admin(&self, method: &str, uri: &str) -> (StatusCode, Value) {
        self.request(method, uri, None, &[("x-admin-key", ADMIN_KEY)])
            .await
    }
}
