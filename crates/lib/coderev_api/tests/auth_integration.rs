//! Session endpoints over in-memory stores.

mod common;

use axum::http::{Method, StatusCode};
use common::{app, register, send, send_raw};
use serde_json::json;

#[tokio::test]
async fn register_returns_user_and_token_pair() {
    let app = app();
    let body = register(&app, "ann@example.com").await;

    assert_eq!(body["message"], "Registration successful");
    assert_eq!(body["user"]["email"], "ann@example.com");
    assert_eq!(body["user"]["name"], "Test User");
    assert!(body["user"]["id"].is_string());
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["accessToken"].is_string());
    assert!(body["refreshToken"].is_string());
}

#[tokio::test]
async fn duplicate_email_is_conflict() {
    let app = app();
    register(&app, "dup@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"email": "dup@example.com", "password": "password123", "name": "Other"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn invalid_registration_is_bad_request() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"email": "not-an-email", "password": "short", "name": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = app();
    register(&app, "bob@example.com").await;

    let (wrong_pw, wrong_pw_body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "bob@example.com", "password": "wrong-password"})),
    )
    .await;
    let (unknown, unknown_body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "nobody@example.com", "password": "password123"})),
    )
    .await;

    assert_eq!(wrong_pw, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw_body, unknown_body);
}

#[tokio::test]
async fn login_returns_fresh_tokens() {
    let app = app();
    register(&app, "cat@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "cat@example.com", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");

    let token = body["accessToken"].as_str().unwrap();
    let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["email"], "cat@example.com");
    assert_eq!(me["user"]["userId"], body["user"]["id"]);
}

#[tokio::test]
async fn me_requires_valid_access_token() {
    let app = app();
    let body = register(&app, "dan@example.com").await;

    let (status, _) = send(&app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/auth/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Refresh tokens are signed with a different key.
    let refresh = body["refreshToken"].as_str().unwrap();
    let (status, _) = send(&app, Method::GET, "/api/auth/me", Some(refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rotates_and_old_token_is_single_use() {
    let app = app();
    let body = register(&app, "eve@example.com").await;
    let original = body["refreshToken"].as_str().unwrap().to_string();

    let (status, rotated) = send(
        &app,
        Method::POST,
        "/api/auth/refresh",
        None,
        Some(json!({"refreshToken": original})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let next = rotated["refreshToken"].as_str().unwrap();
    assert_ne!(next, original);
    assert!(rotated["accessToken"].is_string());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/refresh",
        None,
        Some(json!({"refreshToken": original})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/refresh",
        None,
        Some(json!({"refreshToken": next})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_without_token_is_bad_request() {
    let app = app();
    let (status, body) = send(&app, Method::POST, "/api/auth/refresh", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Refresh token is required");
}

#[tokio::test]
async fn access_token_cannot_refresh() {
    let app = app();
    let body = register(&app, "fay@example.com").await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/refresh",
        None,
        Some(json!({"refreshToken": body["accessToken"]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_always_succeeds() {
    let app = app();
    for body in [None, Some(json!({})), Some(json!({"refreshToken": "unknown"}))] {
        let (status, resp) = send(&app, Method::POST, "/api/auth/logout", None, body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["success"], true);
    }
}

#[tokio::test]
async fn logout_revokes_refresh_token() {
    let app = app();
    let body = register(&app, "gus@example.com").await;
    let refresh = body["refreshToken"].clone();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/logout",
        None,
        Some(json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/refresh",
        None,
        Some(json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Access tokens stay valid until they expire.
    let access = body["accessToken"].as_str().unwrap();
    let (status, _) = send(&app, Method::GET, "/api/auth/me", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn name_longer_than_column_is_bad_request() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"email": "long@example.com", "password": "password123", "name": "N".repeat(101)})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    // Nothing was stored: the same email can still register.
    register(&app, "long@example.com").await;
}

#[tokio::test]
async fn missing_fields_use_error_body() {
    let app = app();
    for (uri, payload) in [
        (
            "/api/auth/register",
            json!({"email": "a@example.com", "password": "password123"}),
        ),
        ("/api/auth/login", json!({"email": "a@example.com"})),
    ] {
        let (status, body) = send(&app, Method::POST, uri, None, Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "validation_error", "{uri}");
        assert!(body["message"].is_string(), "{uri}");
    }
}

#[tokio::test]
async fn malformed_or_untyped_body_uses_error_body() {
    let app = app();

    let (status, body) = send_raw(
        &app,
        "/api/auth/login",
        None,
        Some("application/json"),
        "{\"email\": ",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = send_raw(
        &app,
        "/api/auth/refresh",
        None,
        None,
        r#"{"refreshToken": "x"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}
