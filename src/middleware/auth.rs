use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use subtle::ConstantTimeEq;

use crate::error::BlogError;
use crate::router::BlogState;

/// Ensure the inbound request carries the admin key.
/// Accepts either:
/// - Header: `x-admin-key: ...`
/// - Header: `Authorization: Bearer ...`
///
/// Always rejects when no admin key is configured.
pub fn ensure_admin(headers: &HeaderMap, expected: Option<&str>) -> Result<(), BlogError> {
    let Some(expected) = expected else {
        return Err(BlogError::Unauthorized);
    };

    if let Some(hv) = headers.get("x-admin-key").and_then(|v| v.to_str().ok())
        && keys_match(hv.trim(), expected)
    {
        return Ok(());
    }

    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let auth = auth.trim();
        if let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            && keys_match(token.trim(), expected)
        {
            return Ok(());
        }
    }

    Err(BlogError::Unauthorized)
}

fn keys_match(given: &str, expected: &str) -> bool {
    bool::from(given.as_bytes().ct_eq(expected.as_bytes()))
}

#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl FromRequestParts<BlogState> for RequireAdmin {
    type Rejection = BlogError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &BlogState,
    ) -> Result<Self, Self::Rejection> {
        ensure_admin(&parts.headers, state.admin_key.as_deref())?;
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: &'static str, value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(name, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn accepts_admin_header_and_bearer() {
        assert!(ensure_admin(&headers("x-admin-key", "s3cret"), Some("s3cret")).is_ok());
        assert!(ensure_admin(&headers("authorization", "Bearer s3cret"), Some("s3cret")).is_ok());
    }

    #[test]
    fn rejects_wrong_or_missing_key() {
        assert!(ensure_admin(&headers("x-admin-key", "nope"), Some("s3cret")).is_err());
        assert!(ensure_admin(&HeaderMap::new(), Some("s3cret")).is_err());
    }

    #[test]
    fn rejects_everything_without_configured_key() {
        assert!(ensure_admin(&headers("x-admin-key", ""), None).is_err());
    }
}
