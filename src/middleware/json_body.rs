use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
};
use serde::de::DeserializeOwned;

use crate::error::BlogError;
use crate::types::requests::{
    COMMENT_FIELDS_REQUIRED, CreateCommentRequest, CreatePostRequest, POST_FIELDS_REQUIRED,
    parse_body,
};

/// Request bodies that report a single message for any shape problem.
pub trait RequiredFields: DeserializeOwned {
    const REQUIRED_MESSAGE: &'static str;
}

impl RequiredFields for CreatePostRequest {
    const REQUIRED_MESSAGE: &'static str = POST_FIELDS_REQUIRED;
}

impl RequiredFields for CreateCommentRequest {
    const REQUIRED_MESSAGE: &'static str = COMMENT_FIELDS_REQUIRED;
}

/// JSON body extractor that ignores `Content-Type` and maps failures onto
/// [`BlogError`] instead of axum's plain-text rejections.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: RequiredFields + Send,
{
    type Rejection = BlogError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = match Bytes::from_request(req, state).await {
            Ok(b) => b,
            Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                return Err(BlogError::PayloadTooLarge);
            }
            Err(_) => return Err(BlogError::InvalidJson),
        };
        parse_body(&body, T::REQUIRED_MESSAGE).map(JsonBody)
    }
}
