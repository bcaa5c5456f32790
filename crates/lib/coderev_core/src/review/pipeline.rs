//! Review pipeline: create `pending` → analyze → finalize.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::analyzer::{AnalysisError, AnalysisRequest, CodeAnalyzer};
use super::store::ReviewStore;
use super::ReviewError;
use crate::models::review::{CodeReviewRecord, CodeReviewSummary, NewReview};
use crate::validation;

/// Default upper bound on one analysis call, on top of any client timeout.
pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(90);

/// Drives review records through their lifecycle.
#[derive(Clone)]
pub struct ReviewPipeline {
    store: Arc<dyn ReviewStore>,
    analyzer: Arc<dyn CodeAnalyzer>,
    analysis_timeout: Duration,
}

impl ReviewPipeline {
    pub fn new(store: Arc<dyn ReviewStore>, analyzer: Arc<dyn CodeAnalyzer>) -> Self {
        Self {
            store,
            analyzer,
            analysis_timeout: DEFAULT_ANALYSIS_TIMEOUT,
        }
    }

    pub fn with_analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = timeout;
        self
    }

    /// Upper bound on one analysis call. A stale-pending sweep must use a
    /// longer age, or it fails reviews still being analyzed.
    pub fn analysis_timeout(&self) -> Duration {
        self.analysis_timeout
    }

    /// Submit code for review and wait for the terminal record.
    ///
    /// The `pending` row is visible to readers before analysis starts. On
    /// analysis failure the row is marked `failed` before the error is
    /// returned. Analysis and finalize run on their own task, so dropping
    /// this future does not abandon the record.
    pub async fn submit(
        &self,
        user_id: Uuid,
        title: &str,
        language: &str,
        code: &str,
    ) -> Result<CodeReviewRecord, ReviewError> {
        let review = NewReview {
            user_id,
            title: title.trim().to_string(),
            language: language.trim().to_string(),
            code: code.to_string(),
        };
        validation::check(&review).map_err(ReviewError::Validation)?;

        let pending = self.store.insert_pending(&review).await?;
        info!(
            review_id = %pending.id,
            user_id = %user_id,
            language = %pending.language,
            analyzer = self.analyzer.name(),
            "starting AI code review"
        );

        let this = self.clone();
        let request = AnalysisRequest {
            language: review.language,
            code: review.code,
        };
        tokio::spawn(async move { this.analyze_and_finalize(pending.id, request).await })
            .await
            .map_err(|e| ReviewError::Internal(format!("review task: {e}")))?
    }

    /// Fetch a review owned by `user_id`. Missing and foreign ids look the same.
    pub async fn get_by_id(
        &self,
        review_id: Uuid,
        user_id: Uuid,
    ) -> Result<CodeReviewRecord, ReviewError> {
        self.store
            .find_for_user(review_id, user_id)
            .await?
            .ok_or(ReviewError::NotFound)
    }

    /// Summaries of the caller's reviews, newest first.
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<CodeReviewSummary>, ReviewError> {
        Ok(self.store.list_by_user(user_id).await?)
    }

    /// Fail every review still `pending` after `max_age`. Covers records
    /// whose finalize write never landed.
    pub async fn reconcile_stale(&self, max_age: Duration) -> Result<u64, ReviewError> {
        let max_age = chrono::Duration::from_std(max_age)
            .map_err(|e| ReviewError::Internal(format!("max_age out of range: {e}")))?;
        let swept = self.store.fail_stale_pending(Utc::now() - max_age).await?;
        if swept > 0 {
            warn!(count = swept, "marked stale pending reviews as failed");
        }
        Ok(swept)
    }

    async fn analyze_and_finalize(
        &self,
        review_id: Uuid,
        request: AnalysisRequest,
    ) -> Result<CodeReviewRecord, ReviewError> {
        let outcome = match tokio::time::timeout(
            self.analysis_timeout,
            self.analyzer.analyze(&request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AnalysisError::Timeout(self.analysis_timeout)),
        };

        match outcome {
            Ok(feedback) => {
                let score = feedback.overall_score;
                // A failed write here leaves the row pending for the sweeper.
                let updated = self
                    .store
                    .complete(review_id, &feedback)
                    .await?
                    .ok_or(ReviewError::AlreadyFinalized(review_id))?;
                info!(review_id = %review_id, score, "code review completed");
                Ok(updated)
            }
            Err(source) => {
                match self.store.fail(review_id).await {
                    Ok(Some(_)) => {}
                    Ok(None) => warn!(review_id = %review_id, "review already finalized"),
                    Err(e) => error!(
                        review_id = %review_id,
                        error = %e,
                        "failed to mark review as failed"
                    ),
                }
                error!(review_id = %review_id, error = %source, "code review failed");
                Err(ReviewError::Pipeline { review_id, source })
            }
        }
    }
}
