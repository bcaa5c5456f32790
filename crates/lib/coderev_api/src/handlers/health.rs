//! Liveness endpoints.

use axum::Json;
use chrono::Utc;

use crate::models::{BannerResponse, HealthResponse};

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        timestamp: Utc::now(),
    })
}

/// `GET /`: service banner.
pub async fn root() -> Json<BannerResponse> {
    Json(BannerResponse {
        message: coderev_core::banner(),
        version: coderev_core::version().to_string(),
    })
}
