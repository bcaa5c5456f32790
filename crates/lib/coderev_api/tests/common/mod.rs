//! Shared harness: in-memory stores, a scripted analyzer and a JSON client
//! over `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use coderev_api::{AppState, config::ApiConfig};
use coderev_core::auth::PasswordHasher;
use coderev_core::models::review::ReviewFeedback;
use coderev_core::review::{AnalysisError, AnalysisRequest, AnalyzerConfig, CodeAnalyzer};
use serde_json::{Value, json};
use tower::ServiceExt;

/// Returns fixed feedback, or a transport failure when `feedback` is `None`.
pub struct ScriptedAnalyzer {
    pub feedback: Option<ReviewFeedback>,
}

#[async_trait]
impl CodeAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, _request: &AnalysisRequest) -> Result<ReviewFeedback, AnalysisError> {
        self.feedback
            .clone()
            .ok_or_else(|| AnalysisError::Transport("connection refused".into()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn feedback() -> ReviewFeedback {
    serde_json::from_value(json!({
        "summary": "Readable, with one edge case.",
        "overallScore": 78,
        "issues": [{
            "severity": "major",
            "category": "bug",
            "line": 2,
            "title": "Division by zero",
            "description": "`b` may be zero.",
            "suggestion": "Guard the divisor."
        }],
        "strengths": ["Small function"],
        "improvements": ["Add tests"],
        "optimizedCode": "def div(a, b):\n    return a / b if b else None"
    }))
    .unwrap()
}

pub fn test_config() -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        database_url: "postgres://unused".into(),
        access_token_secret: "test-access-secret".into(),
        refresh_token_secret: "test-refresh-secret".into(),
        frontend_url: None,
        analyzer: AnalyzerConfig::default(),
    }
}

/// Router with a succeeding analyzer.
pub fn app() -> Router {
    app_with(Some(feedback()))
}

/// Router whose analyzer returns `feedback`, or fails when `None`.
pub fn app_with(feedback: Option<ReviewFeedback>) -> Router {
    let mut state = AppState::in_memory_with_analyzer(
        test_config(),
        Arc::new(ScriptedAnalyzer { feedback }),
    )
    .unwrap();
    state.sessions = state.sessions.with_hasher(PasswordHasher::with_cost(4));
    coderev_api::router(state)
}

/// Send a request and decode the JSON body (`Null` when empty).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Send a raw body with an optional content type.
pub async fn send_raw(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    content_type: Option<&str>,
    body: &str,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();

    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Register `email` and return the response body.
pub async fn register(app: &Router, email: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"email": email, "password": "password123", "name": "Test User"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body
}

/// Register `email` and return its access token.
pub async fn access_token(app: &Router, email: &str) -> String {
    register(app, email).await["accessToken"]
        .as_str()
        .unwrap()
        .to_string()
}
