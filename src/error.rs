//! Request-level error kinds and their mapping to HTTP responses.
//!
//! Every layer returns one of these; status codes are assigned only here.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::token::TokenError;
use crate::upstream::client::UpstreamError;

/// Detail returned to callers for any upstream failure.
pub const UPSTREAM_FAILURE_DETAIL: &str = "Upstream completion failed";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing request fields.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Missing, malformed, expired or badly signed token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The completion provider failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// A local failure unrelated to the caller's input (e.g. token signing).
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error body: `{"detail": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Upstream(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Caller-facing message. Upstream and internal detail stays in the logs.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Unauthorized(_) => "Could not validate credentials".to_string(),
            ApiError::Upstream(_) => UPSTREAM_FAILURE_DETAIL.to_string(),
            ApiError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing(_) => ApiError::Internal(e.to_string()),
            TokenError::Expired | TokenError::Invalid(_) => ApiError::Unauthorized(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorBody {
            detail: self.detail(),
        });

        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
