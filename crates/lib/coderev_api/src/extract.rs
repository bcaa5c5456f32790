//! Request extractors.

use axum::extract::FromRequest;

use crate::error::AppError;

/// `axum::Json` whose rejections (missing fields, malformed JSON, wrong
/// content type) answer with the API error body instead of plain text.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
