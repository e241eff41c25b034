use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::Error as SqlxError;
use std::collections::HashMap;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum BlogError {
    #[error("Invalid JSON format.")]
    InvalidJson,

    #[error("{0}")]
    Validation(String),

    #[error("Post not found.")]
    PostNotFound,

    /// Comment submitted against a post that does not exist.
    #[error("Post not found or internal error.")]
    CommentPostNotFound,

    #[error("Comment not found.")]
    CommentNotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("Request body too large.")]
    PayloadTooLarge,

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("Gemini API error: {0:?}")]
    GeminiServerError(GeminiError),

    #[error("moderation response had no text candidate")]
    EmptyModeration,

    #[error("moderation timed out")]
    ModerationTimeout,
}

impl BlogError {
    pub fn validation(msg: impl Into<String>) -> Self {
        BlogError::Validation(msg.into())
    }
}

impl IntoResponse for BlogError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            BlogError::InvalidJson | BlogError::Validation(_) | BlogError::CommentPostNotFound => {
                StatusCode::BAD_REQUEST
            }
            BlogError::PostNotFound | BlogError::CommentNotFound => StatusCode::NOT_FOUND,
            BlogError::Unauthorized => StatusCode::UNAUTHORIZED,
            BlogError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            BlogError::DatabaseError(_) | BlogError::UrlParse(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            BlogError::Reqwest(_)
            | BlogError::UpstreamStatus(_)
            | BlogError::GeminiServerError(_)
            | BlogError::EmptyModeration
            | BlogError::ModerationTimeout => StatusCode::BAD_GATEWAY,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "An internal server error occurred.".to_string()
        } else if status == StatusCode::BAD_GATEWAY {
            "Upstream service is unavailable.".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ApiErrorResponse { error: message })).into_response()
    }
}

/// Error body shared by every endpoint: `{"error": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
}

/// Gemini API error response structure
#[derive(Deserialize, Debug)]
pub struct GeminiError {
    pub error: GeminiErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct GeminiErrorBody {
    pub code: u32,
    pub message: String,
    #[serde(default)]
    pub status: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}
