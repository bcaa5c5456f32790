//! Request and response bodies.
//!
//! Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use coderev_core::models::auth::{AuthSession, UserSummary};
use coderev_core::models::review::{CodeReviewRecord, CodeReviewSummary};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /api/auth/refresh` and `POST /api/auth/logout`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitReviewRequest {
    pub title: String,
    pub language: String,
    pub code: String,
}

/// Register and login response: the user plus a fresh token pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub message: String,
    pub user: UserSummary,
    pub access_token: String,
    pub refresh_token: String,
}

impl AuthResponse {
    pub fn new(message: &str, session: AuthSession) -> Self {
        Self {
            message: message.to_string(),
            user: session.user,
            access_token: session.tokens.access_token,
            refresh_token: session.tokens.refresh_token,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

/// Identity carried by the verified access token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub user: CurrentUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitReviewResponse {
    pub message: String,
    pub review: CodeReviewRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewResponse {
    pub review: CodeReviewRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewListResponse {
    pub reviews: Vec<CodeReviewSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BannerResponse {
    pub message: String,
    pub version: String,
}

/// Error body returned for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
