//! HTTP API.
//!
//! - GET /               status message (public)
//! - POST /login         mock login, returns an access token (public)
//! - POST /generate      streamed completion (bearer token)
//! - POST /generate_sync single-shot completion (bearer token)

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::credentials::{AcceptAnyCredentials, CredentialVerifier, Credentials};
use crate::auth::gate::AuthenticatedUser;
use crate::auth::token::TokenIssuer;
use crate::config::Config;
use crate::error::ApiError;
use crate::server::extract::ValidJson;
use crate::server::streaming::{relay, RelayOptions};
use crate::upstream::client::{CompletionClient, PromptRequest};

pub const ROOT_MESSAGE: &str = "prompt-relay is running";

/// Application state shared across handlers. Read-only after startup.
pub struct AppState {
    pub client: Arc<dyn CompletionClient>,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub tokens: TokenIssuer,
    pub relay: RelayOptions,
}

impl AppState {
    /// State with the mock credential verifier.
    pub fn new(config: &Config, client: Arc<dyn CompletionClient>, signing_key: &[u8]) -> Self {
        Self {
            client,
            credentials: Arc::new(AcceptAnyCredentials),
            tokens: TokenIssuer::new(signing_key, config.auth.token_ttl()),
            relay: RelayOptions::from(&config.upstream),
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.credentials = verifier;
        self
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/login", post(login))
        .route("/generate", post(generate))
        .route("/generate_sync", post(generate_sync))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Request/Response Types ────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: ROOT_MESSAGE.to_string(),
    })
}

async fn login(
    State(state): State<Arc<AppState>>,
    ValidJson(credentials): ValidJson<Credentials>,
) -> Result<Json<LoginResponse>, ApiError> {
    let subject = state
        .credentials
        .verify(&credentials)
        .await
        .ok_or_else(|| ApiError::Unauthorized("credentials rejected".to_string()))?;

    let token = state.tokens.issue(&subject)?;
    info!(subject, ttl_secs = state.tokens.ttl().num_seconds(), "Issued access token");

    Ok(Json(LoginResponse {
        access_token: token.into_string(),
        token_type: "bearer".to_string(),
    }))
}

async fn generate(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ValidJson(req): ValidJson<PromptRequest>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4().to_string();

    info!(
        request_id,
        subject = user.subject,
        model = state.client.model(),
        max_tokens = req.max_tokens,
        "Streaming generation request"
    );

    let chunks = state.client.complete_stream(&req).await.map_err(|e| {
        error!(request_id, error = %e, "Upstream refused streaming request");
        ApiError::from(e)
    })?;

    let body = Body::from_stream(relay(chunks, state.relay, request_id));

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

async fn generate_sync(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ValidJson(req): ValidJson<PromptRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let request_id = Uuid::new_v4().to_string();

    info!(
        request_id,
        subject = user.subject,
        model = state.client.model(),
        max_tokens = req.max_tokens,
        "Generation request"
    );

    let result = state.client.complete(&req).await.map_err(|e| {
        error!(request_id, error = %e, "Upstream completion failed");
        ApiError::from(e)
    })?;

    info!(request_id, chars = result.text.len(), "Generation complete");

    Ok(Json(GenerateResponse {
        response: result.text,
    }))
}
