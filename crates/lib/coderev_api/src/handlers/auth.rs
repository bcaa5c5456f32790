//! Authentication request handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    AuthResponse, CurrentUser, LoginRequest, LogoutResponse, MeResponse, RefreshRequest,
    RegisterRequest,
};
use coderev_core::models::auth::TokenPair;

/// `POST /api/auth/register`: create an account and its first session.
pub async fn register_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let session = state
        .sessions
        .register(&body.email, &body.password, &body.name)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new("Registration successful", session)),
    ))
}

/// `POST /api/auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let session = state.sessions.login(&body.email, &body.password).await?;
    Ok(Json(AuthResponse::new("Login successful", session)))
}

/// `POST /api/auth/refresh`: exchange a refresh token for a new pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> AppResult<Json<TokenPair>> {
    let token = body
        .refresh_token
        .ok_or_else(|| AppError::Validation("Refresh token is required".into()))?;
    let pair = state.sessions.refresh(&token).await?;
    Ok(Json(pair))
}

/// `POST /api/auth/logout`: revoke a refresh token.
///
/// Always answers 200, even for a missing, unparseable or unknown token.
pub async fn logout_handler(State(state): State<AppState>, body: Bytes) -> Json<LogoutResponse> {
    let request: RefreshRequest = serde_json::from_slice(&body).unwrap_or_default();
    state.sessions.logout(request.refresh_token.as_deref()).await;
    Json(LogoutResponse {
        success: true,
        message: "Logged out successfully".into(),
    })
}

/// `GET /api/auth/me`: identity from the verified access token.
pub async fn me_handler(
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
) -> Json<MeResponse> {
    Json(MeResponse {
        user: CurrentUser {
            user_id: claims.sub,
            email: claims.email,
        },
    })
}
