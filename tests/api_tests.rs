//! Integration tests for login, auth gating and single-shot generation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use tower::ServiceExt;

use prompt_relay::auth::credentials::{CredentialVerifier, Credentials};
use prompt_relay::auth::token::TokenIssuer;
use prompt_relay::config::Config;
use prompt_relay::error::{ErrorBody, UPSTREAM_FAILURE_DETAIL};
use prompt_relay::server::api::{build_router, AppState, GenerateResponse, LoginResponse, RootResponse};
use prompt_relay::upstream::mock::MockCompletionClient;

const SECRET: &[u8] = b"integration-test-secret";

fn app_with(client: Arc<MockCompletionClient>) -> Router {
    build_router(Arc::new(AppState::new(&Config::default(), client, SECRET)))
}

fn post_json(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            None,
            serde_json::json!({"username": username, "password": password}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json::<LoginResponse>(response).await.access_token
}

#[tokio::test]
async fn test_root_is_public() {
    let app = app_with(Arc::new(MockCompletionClient::new("unused")));

    for auth in [None, Some("Bearer garbage")] {
        let mut builder = Request::builder().uri("/");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let root: RootResponse = body_json(response).await;
        assert!(!root.message.is_empty());
    }
}

#[tokio::test]
async fn test_login_accepts_any_non_empty_credentials() {
    let app = app_with(Arc::new(MockCompletionClient::new("unused")));

    for (user, pass) in [("testuser", "testpass"), ("a", "b"), ("ünïcode", "p@ss word")] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/login",
                None,
                serde_json::json!({"username": user, "password": pass}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let login: LoginResponse = body_json(response).await;
        assert!(!login.access_token.is_empty());
        assert_eq!(login.token_type, "bearer");
    }
}

#[tokio::test]
async fn test_login_rejects_malformed_bodies() {
    let app = app_with(Arc::new(MockCompletionClient::new("unused")));

    let bodies = [
        serde_json::json!({"username": "testuser"}),
        serde_json::json!({"password": "testpass"}),
        serde_json::json!({"username": 42, "password": "testpass"}),
        serde_json::json!({"username": "", "password": "testpass"}),
        serde_json::json!({"username": "testuser", "password": ""}),
    ];

    for body in bodies {
        let response = app
            .clone()
            .oneshot(post_json("/login", None, body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{body}");
        let err: ErrorBody = body_json(response).await;
        assert!(!err.detail.is_empty());
    }

    let not_json = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{username"))
        .unwrap();
    let response = app.clone().oneshot(not_json).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let no_content_type = Request::builder()
        .method("POST")
        .uri("/login")
        .body(Body::from(r#"{"username":"u","password":"p"}"#))
        .unwrap();
    let response = app.oneshot(no_content_type).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

struct RejectAll;

#[async_trait]
impl CredentialVerifier for RejectAll {
    async fn verify(&self, _credentials: &Credentials) -> Option<String> {
        None
    }
}

#[tokio::test]
async fn test_login_with_rejecting_verifier() {
    let state = AppState::new(
        &Config::default(),
        Arc::new(MockCompletionClient::new("unused")),
        SECRET,
    )
    .with_verifier(Arc::new(RejectAll));
    let app = build_router(Arc::new(state));

    let response = app
        .oneshot(post_json(
            "/login",
            None,
            serde_json::json!({"username": "u", "password": "p"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_generate_sync_with_token() {
    let client = Arc::new(MockCompletionClient::new("A black hole is a region of spacetime."));
    let app = app_with(client.clone());
    let token = login(&app, "testuser", "testpass").await;

    let response = app
        .oneshot(post_json(
            "/generate_sync",
            Some(&token),
            serde_json::json!({"prompt": "Explain black holes", "max_tokens": 50}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let generated: GenerateResponse = body_json(response).await;
    assert_eq!(generated.response, "A black hole is a region of spacetime.");
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_generate_sync_without_token_never_reaches_upstream() {
    let client = Arc::new(MockCompletionClient::new("unused"));
    let app = app_with(client.clone());

    let response = app
        .clone()
        .oneshot(post_json(
            "/generate_sync",
            None,
            serde_json::json!({"prompt": "Hello", "max_tokens": 50}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );

    // Auth is checked before the body, so a bad body still gives 401.
    let response = app
        .oneshot(post_json("/generate_sync", None, serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_generate_sync_rejects_bad_tokens() {
    let client = Arc::new(MockCompletionClient::new("unused"));
    let app = app_with(client.clone());
    let foreign = TokenIssuer::new(b"someone-elses-secret", chrono::Duration::minutes(30))
        .issue("mallory")
        .unwrap();

    let bad_headers = [
        "Bearer not-a-jwt".to_string(),
        format!("Bearer {}", foreign.as_str()),
        "Basic dXNlcjpwYXNz".to_string(),
        "Bearer".to_string(),
    ];

    for value in bad_headers {
        let request = Request::builder()
            .method("POST")
            .uri("/generate_sync")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, value.as_str())
            .body(Body::from(r#"{"prompt":"hi"}"#))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{value}");
    }

    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_token_rejected_after_expiry() {
    let client = Arc::new(MockCompletionClient::new("still here"));
    let app = app_with(client.clone());

    // Same key and lifetime as the app; backdated so it expires in ~2s.
    let issuer = TokenIssuer::new(SECRET, Config::default().auth.token_ttl());
    let issued_at = Utc::now() - issuer.ttl() + chrono::Duration::seconds(2);
    let token = issuer.issue_at("testuser", issued_at).unwrap();

    let body = serde_json::json!({"prompt": "Explain black holes", "max_tokens": 50});

    let response = app
        .clone()
        .oneshot(post_json("/generate_sync", Some(token.as_str()), body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_secs(4)).await;

    let response = app
        .oneshot(post_json("/generate_sync", Some(token.as_str()), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_generate_sync_validates_body() {
    let client = Arc::new(MockCompletionClient::new("unused"));
    let app = app_with(client.clone());
    let token = login(&app, "testuser", "testpass").await;

    let bodies = [
        serde_json::json!({"max_tokens": 50}),
        serde_json::json!({"prompt": ""}),
        serde_json::json!({"prompt": "hi", "max_tokens": 0}),
        serde_json::json!({"prompt": "hi", "max_tokens": -3}),
        serde_json::json!({"prompt": "hi", "max_tokens": "many"}),
    ];

    for body in bodies {
        let response = app
            .clone()
            .oneshot(post_json("/generate_sync", Some(&token), body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    }

    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_generate_sync_upstream_failure_is_generic_500() {
    let client = Arc::new(MockCompletionClient::new("unused").failing());
    let app = app_with(client.clone());
    let token = login(&app, "testuser", "testpass").await;

    let response = app
        .oneshot(post_json(
            "/generate_sync",
            Some(&token),
            serde_json::json!({"prompt": "Explain black holes"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let err: ErrorBody = body_json(response).await;
    assert_eq!(err.detail, UPSTREAM_FAILURE_DETAIL);
    assert!(!err.detail.contains("mock provider"));
    assert_eq!(client.calls(), 1);
}
