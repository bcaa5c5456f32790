//! PostgreSQL implementation of the review store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::store::ReviewStore;
use crate::db::{StoreError, StoreResult};
use crate::models::review::{CodeReviewRecord, CodeReviewSummary, NewReview, ReviewFeedback};
use crate::uuid::uuidv7;

const REVIEW_COLUMNS: &str = "id, user_id, title, language, code, status, review_feedback, \
                              optimized_code, overall_score, created_at, updated_at";

/// Row returned by review queries.
#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    language: String,
    code: String,
    status: String,
    review_feedback: Option<Json<ReviewFeedback>>,
    optimized_code: Option<String>,
    overall_score: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for CodeReviewRecord {
    type Error = StoreError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(CodeReviewRecord {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            language: row.language,
            code: row.code,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            review_feedback: row.review_feedback.map(|Json(f)| f),
            optimized_code: row.optimized_code,
            overall_score: row.overall_score,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Row returned by the list query.
#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    id: Uuid,
    title: String,
    language: String,
    overall_score: Option<i32>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SummaryRow> for CodeReviewSummary {
    type Error = StoreError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        Ok(CodeReviewSummary {
            id: row.id,
            title: row.title,
            language: row.language,
            overall_score: row.overall_score,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
        })
    }
}

fn into_record(row: Option<ReviewRow>) -> StoreResult<Option<CodeReviewRecord>> {
    row.map(CodeReviewRecord::try_from).transpose()
}

/// Review table backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgReviewStore {
    pool: PgPool,
}

impl PgReviewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    async fn insert_pending(&self, review: &NewReview) -> StoreResult<CodeReviewRecord> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "INSERT INTO code_reviews (id, user_id, title, language, code, status) \
             VALUES ($1, $2, $3, $4, $5, 'pending') \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(uuidv7())
        .bind(review.user_id)
        .bind(&review.title)
        .bind(&review.language)
        .bind(&review.code)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn complete(
        &self,
        id: Uuid,
        feedback: &ReviewFeedback,
    ) -> StoreResult<Option<CodeReviewRecord>> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "UPDATE code_reviews \
             SET review_feedback = $2, optimized_code = $3, overall_score = $4, \
                 status = 'completed', updated_at = now() \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(id)
        .bind(Json(feedback))
        .bind(&feedback.optimized_code)
        .bind(feedback.overall_score)
        .fetch_optional(&self.pool)
        .await?;
        into_record(row)
    }

    async fn fail(&self, id: Uuid) -> StoreResult<Option<CodeReviewRecord>> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "UPDATE code_reviews SET status = 'failed', updated_at = now() \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        into_record(row)
    }

    async fn find_for_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<CodeReviewRecord>> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM code_reviews WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        into_record(row)
    }

    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<CodeReviewSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT id, title, language, overall_score, status, created_at
            FROM code_reviews
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CodeReviewSummary::try_from).collect()
    }

    async fn fail_stale_pending(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE code_reviews SET status = 'failed', updated_at = now() \
             WHERE status = 'pending' AND created_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
