//! Storage seam for review records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::StoreResult;
use crate::models::review::{CodeReviewRecord, CodeReviewSummary, NewReview, ReviewFeedback};

/// Durable table of review records.
///
/// The two finalize operations only touch rows still in `pending`, which
/// keeps each terminal status write-once. They return `None` when the row
/// is missing or already terminal.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Insert a record in `pending` with no feedback.
    async fn insert_pending(&self, review: &NewReview) -> StoreResult<CodeReviewRecord>;

    /// `pending` → `completed`, storing feedback, score and optimized code.
    async fn complete(
        &self,
        id: Uuid,
        feedback: &ReviewFeedback,
    ) -> StoreResult<Option<CodeReviewRecord>>;

    /// `pending` → `failed`, leaving feedback, score and optimized code null.
    async fn fail(&self, id: Uuid) -> StoreResult<Option<CodeReviewRecord>>;

    /// Fetch a record scoped to its owner.
    async fn find_for_user(&self, id: Uuid, user_id: Uuid)
    -> StoreResult<Option<CodeReviewRecord>>;

    /// Summaries for `user_id`, newest first.
    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<CodeReviewSummary>>;

    /// Mark every `pending` record created before `cutoff` as `failed`.
    /// Returns the number of records transitioned.
    async fn fail_stale_pending(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}
