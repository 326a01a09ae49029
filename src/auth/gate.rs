//! Auth gate for protected routes.
//!
//! [`AuthenticatedUser`] is an extractor: listing it before the body
//! extractor in a handler means the token is checked before the body is read.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use crate::error::ApiError;
use crate::server::api::AppState;

/// The validated subject of the request's bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub subject: String,
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".to_string()))?;

        let value = header
            .to_str()
            .map_err(|_| ApiError::Unauthorized("non-ASCII Authorization header".to_string()))?;

        let token = bearer_token(value)
            .ok_or_else(|| ApiError::Unauthorized("expected a Bearer token".to_string()))?;

        let claims = state.tokens.validate(token).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            ApiError::from(e)
        })?;

        Ok(AuthenticatedUser {
            subject: claims.sub,
        })
    }
}
