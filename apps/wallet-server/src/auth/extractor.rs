// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the caller's bearer token.
//!
//! The token is handed to the service layer unverified; services resolve the
//! caller through a [`TokenVerifier`](super::TokenVerifier) as part of
//! validating the request.
//!
//! ```rust,ignore
//! async fn my_handler(BearerToken(token): BearerToken) -> impl IntoResponse {
//!     // token is the raw JWT without the "Bearer " prefix
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::AuthError;

/// Raw JWT taken from `Authorization: Bearer <token>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidAuthHeader)?;

        Ok(BearerToken(token.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn requires_auth_header() {
        let mut parts = parts_with(None);
        let result = BearerToken::from_request_parts(&mut parts, &()).await;
        assert_eq!(result, Err(AuthError::MissingAuthHeader));
    }

    #[tokio::test]
    async fn rejects_non_bearer_scheme() {
        let mut parts = parts_with(Some("Basic dXNlcjpwYXNz"));
        let result = BearerToken::from_request_parts(&mut parts, &()).await;
        assert_eq!(result, Err(AuthError::InvalidAuthHeader));
    }

    #[tokio::test]
    async fn rejects_empty_token() {
        let mut parts = parts_with(Some("Bearer "));
        let result = BearerToken::from_request_parts(&mut parts, &()).await;
        assert_eq!(result, Err(AuthError::InvalidAuthHeader));
    }

    #[tokio::test]
    async fn strips_bearer_prefix() {
        let mut parts = parts_with(Some("Bearer abc.def.ghi"));
        let BearerToken(token) = BearerToken::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(token, "abc.def.ghi");
    }
}
