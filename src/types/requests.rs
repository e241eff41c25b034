//! Inbound JSON bodies and their validation.

use crate::db::models::{AUTHOR_NAME_MAX_CHARS, TITLE_MAX_CHARS};
use crate::error::BlogError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub const POST_FIELDS_REQUIRED: &str = "Title and content are required.";
pub const COMMENT_FIELDS_REQUIRED: &str = "post_id, author_name, and text are required.";

/// Decode a raw body in two steps so that syntax errors and shape errors
/// produce different messages. Only JSON objects are accepted; derived
/// `Deserialize` would otherwise fill struct fields from an array by position.
pub fn parse_body<T: DeserializeOwned>(body: &[u8], shape_error: &str) -> Result<T, BlogError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| BlogError::InvalidJson)?;
    if !value.is_object() {
        return Err(BlogError::validation(shape_error));
    }
    serde_json::from_value(value).map_err(|_| BlogError::validation(shape_error))
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub title: String,
    pub content: String,
}

impl CreatePostRequest {
    pub fn validate(self) -> Result<NewPost, BlogError> {
        let (Some(title), Some(content)) = (present(self.title), present(self.content)) else {
            return Err(BlogError::validation(POST_FIELDS_REQUIRED));
        };
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(BlogError::validation(format!(
                "Title must be at most {TITLE_MAX_CHARS} characters."
            )));
        }
        Ok(NewPost { title, content })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub post_id: Option<i64>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub post_id: i64,
    pub author_name: String,
    pub text: String,
}

impl CreateCommentRequest {
    pub fn validate(self) -> Result<NewComment, BlogError> {
        let post_id = self.post_id.filter(|id| *id != 0);
        let (Some(post_id), Some(author_name), Some(text)) =
            (post_id, present(self.author_name), present(self.text))
        else {
            return Err(BlogError::validation(COMMENT_FIELDS_REQUIRED));
        };
        if author_name.chars().count() > AUTHOR_NAME_MAX_CHARS {
            return Err(BlogError::validation(format!(
                "Author name must be at most {AUTHOR_NAME_MAX_CHARS} characters."
            )));
        }
        Ok(NewComment {
            post_id,
            author_name,
            text,
        })
    }
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}
