use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::db::models::{Comment, Post, format_timestamp};
use crate::error::BlogError;
use crate::middleware::{JsonBody, RequireAdmin};
use crate::router::BlogState;
use crate::types::requests::CreatePostRequest;

/// Entry of `GET /api/posts/`.
#[derive(Debug, Serialize)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub published_date: String,
}

impl From<Post> for PostSummary {
    fn from(p: Post) -> Self {
        Self {
            id: p.id,
            published_date: format_timestamp(&p.published_date),
            title: p.title,
        }
    }
}

/// A post together with its visible comments.
#[derive(Debug, Serialize)]
pub struct PostWithComments {
    #[serde(flatten)]
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// Parse a path id the way `<int:pk>` routes do: positive integers only,
/// anything else is simply not found.
pub(crate) fn parse_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

/// GET /api/posts/
pub async fn list_posts(State(state): State<BlogState>) -> Result<Json<Vec<PostSummary>>, BlogError> {
    let posts = state.storage.list_posts().await?;
    Ok(Json(posts.into_iter().map(PostSummary::from).collect()))
}

/// POST /api/posts/
pub async fn create_post(
    State(state): State<BlogState>,
    JsonBody(req): JsonBody<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostWithComments>), BlogError> {
    let new_post = req.validate()?;
    let published: DateTime<Utc> = Utc::now();
    let post = state
        .storage
        .create_post(&new_post.title, &new_post.content, published)
        .await?;
    info!(id = post.id, title = %post, "post created");
    Ok((
        StatusCode::CREATED,
        Json(PostWithComments {
            post,
            comments: Vec::new(),
        }),
    ))
}

/// GET /api/posts/{id}/
pub async fn get_post(
    State(state): State<BlogState>,
    Path(raw_id): Path<String>,
) -> Result<Json<PostWithComments>, BlogError> {
    let id = parse_id(&raw_id).ok_or(BlogError::PostNotFound)?;
    let post = state
        .storage
        .get_post(id)
        .await?
        .ok_or(BlogError::PostNotFound)?;
    let comments = state.storage.comments_for_post(id, false).await?;
    Ok(Json(PostWithComments { post, comments }))
}

/// DELETE /api/posts/{id}/ (admin); comments go with the post.
pub async fn delete_post(
    _admin: RequireAdmin,
    State(state): State<BlogState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, BlogError> {
    let id = parse_id(&raw_id).ok_or(BlogError::PostNotFound)?;
    if !state.storage.delete_post(id).await? {
        return Err(BlogError::PostNotFound);
    }
    info!(id, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}
