use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::Config;
use crate::db::BlogStorage;
use crate::error::ApiErrorResponse;
use crate::handlers::{comments, posts};
use crate::service::Moderator;

#[derive(Clone)]
pub struct BlogState {
    pub storage: BlogStorage,
    pub moderator: Moderator,
    pub admin_key: Option<Arc<str>>,
}

impl BlogState {
    pub fn new(storage: BlogStorage, moderator: Moderator) -> Self {
        Self {
            storage,
            moderator,
            admin_key: None,
        }
    }

    pub fn with_admin_key(mut self, key: Option<&str>) -> Self {
        self.admin_key = key.map(Arc::from);
        self
    }
}

/// Transport-level settings applied around the routes.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub cors_origins: Vec<String>,
    pub max_body_bytes: usize,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl HttpOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            cors_origins: cfg.cors_origins.clone(),
            max_body_bytes: cfg.max_body_bytes,
        }
    }

    fn cors_layer(&self) -> CorsLayer {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                HeaderName::from_static("x-admin-key"),
            ]);

        if self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o.trim() == "*") {
            return cors.allow_origin(Any);
        }

        let origins: Vec<HeaderValue> = self
            .cors_origins
            .iter()
            .filter_map(|o| {
                o.trim()
                    .parse::<HeaderValue>()
                    .inspect_err(|e| warn!(origin = %o, error = %e, "ignoring invalid CORS origin"))
                    .ok()
            })
            .collect();
        cors.allow_origin(origins)
    }
}

pub fn blog_router(state: BlogState, opts: &HttpOptions) -> Router {
    let api = Router::new()
        .route("/posts/", get(posts::list_posts).post(posts::create_post))
        .route("/posts/{id}/", get(posts::get_post).delete(posts::delete_post))
        .route("/comments/", post(comments::create_comment))
        .route("/comments/flagged/", get(comments::list_flagged))
        .route("/comments/{id}/", delete(comments::delete_comment))
        .route("/comments/{id}/approve/", post(comments::approve_comment))
        .method_not_allowed_fallback(method_not_allowed);

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(opts.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(opts.cors_layer())
        .with_state(state)
}

fn json_error(status: StatusCode, message: &str) -> (StatusCode, Json<ApiErrorResponse>) {
    (
        status,
        Json(ApiErrorResponse {
            error: message.to_string(),
        }),
    )
}

async fn not_found() -> (StatusCode, Json<ApiErrorResponse>) {
    json_error(StatusCode::NOT_FOUND, "Not found.")
}

async fn method_not_allowed() -> (StatusCode, Json<ApiErrorResponse>) {
    json_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.")
}
