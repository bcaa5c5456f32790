//! Code review request handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ReviewListResponse, ReviewResponse, SubmitReviewRequest, SubmitReviewResponse};

/// `POST /api/reviews`: submit code and wait for the analysis.
pub async fn submit_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<SubmitReviewRequest>,
) -> AppResult<(StatusCode, Json<SubmitReviewResponse>)> {
    let review = state
        .reviews
        .submit(claims.sub, &body.title, &body.language, &body.code)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitReviewResponse {
            message: "Review completed".into(),
            review,
        }),
    ))
}

/// `GET /api/reviews`: the caller's reviews, newest first.
pub async fn list_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
) -> AppResult<Json<ReviewListResponse>> {
    let reviews = state.reviews.list_by_user(claims.sub).await?;
    Ok(Json(ReviewListResponse { reviews }))
}

/// `GET /api/reviews/{id}`: one review owned by the caller.
///
/// Malformed ids answer 404 like missing or foreign ones.
pub async fn get_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ReviewResponse>> {
    let review_id =
        Uuid::parse_str(&id).map_err(|_| AppError::NotFound("Review not found".into()))?;
    let review = state.reviews.get_by_id(review_id, claims.sub).await?;
    Ok(Json(ReviewResponse { review }))
}
