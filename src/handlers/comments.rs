use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::{info, warn};

use crate::db::models::{Comment, FlaggedComment};
use crate::error::BlogError;
use crate::handlers::posts::parse_id;
use crate::middleware::{JsonBody, RequireAdmin};
use crate::router::BlogState;
use crate::types::requests::CreateCommentRequest;

/// POST /api/comments/
///
/// The comment is reviewed before it is stored; the verdict only decides the
/// `flagged` bit, it never rejects the comment.
pub async fn create_comment(
    State(state): State<BlogState>,
    JsonBody(req): JsonBody<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), BlogError> {
    let new_comment = req.validate()?;

    if state.storage.get_post(new_comment.post_id).await?.is_none() {
        return Err(BlogError::CommentPostNotFound);
    }

    let verdict = state.moderator.review(&new_comment.text).await;

    let comment = state
        .storage
        .create_comment(
            new_comment.post_id,
            &new_comment.author_name,
            &new_comment.text,
            Utc::now(),
            verdict.is_flagged(),
        )
        .await
        .map_err(|e| match e {
            // post removed while the comment was being reviewed
            BlogError::DatabaseError(ref db)
                if db
                    .as_database_error()
                    .is_some_and(|d| d.is_foreign_key_violation()) =>
            {
                BlogError::CommentPostNotFound
            }
            other => other,
        })?;

    if comment.flagged {
        warn!(id = comment.id, post_id = comment.post_id, "{comment} flagged for review");
    } else {
        info!(id = comment.id, post_id = comment.post_id, "{comment} created");
    }
    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /api/comments/flagged/
pub async fn list_flagged(
    State(state): State<BlogState>,
) -> Result<Json<Vec<FlaggedComment>>, BlogError> {
    Ok(Json(state.storage.list_flagged().await?))
}

/// POST /api/comments/{id}/approve/ (admin)
pub async fn approve_comment(
    _admin: RequireAdmin,
    State(state): State<BlogState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Comment>, BlogError> {
    let id = parse_id(&raw_id).ok_or(BlogError::CommentNotFound)?;
    if !state.storage.set_flagged(id, false).await? {
        return Err(BlogError::CommentNotFound);
    }
    let comment = state
        .storage
        .get_comment(id)
        .await?
        .ok_or(BlogError::CommentNotFound)?;
    info!(id, "comment approved");
    Ok(Json(comment))
}

/// DELETE /api/comments/{id}/ (admin)
pub async fn delete_comment(
    _admin: RequireAdmin,
    State(state): State<BlogState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, BlogError> {
    let id = parse_id(&raw_id).ok_or(BlogError::CommentNotFound)?;
    if !state.storage.delete_comment(id).await? {
        return Err(BlogError::CommentNotFound);
    }
    info!(id, "comment deleted");
    Ok(StatusCode::NO_CONTENT)
}
