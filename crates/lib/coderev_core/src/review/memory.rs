//! In-process review store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::store::ReviewStore;
use crate::db::StoreResult;
use crate::models::review::{
    CodeReviewRecord, CodeReviewSummary, NewReview, ReviewFeedback, ReviewStatus,
};
use crate::uuid::uuidv7;

/// Review records held in a concurrent map. Each finalize runs under the
/// entry's write lock, so the `pending` guard cannot be raced.
#[derive(Default)]
pub struct MemoryReviewStore {
    reviews: DashMap<Uuid, CodeReviewRecord>,
}

impl MemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unscoped lookup, for assertions.
    pub fn get(&self, id: Uuid) -> Option<CodeReviewRecord> {
        self.reviews.get(&id).map(|r| r.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    fn finalize_with(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut CodeReviewRecord),
    ) -> Option<CodeReviewRecord> {
        let mut entry = self.reviews.get_mut(&id)?;
        if entry.status != ReviewStatus::Pending {
            return None;
        }
        apply(&mut entry);
        entry.updated_at = Utc::now();
        Some(entry.clone())
    }
}

#[async_trait]
impl ReviewStore for MemoryReviewStore {
    async fn insert_pending(&self, review: &NewReview) -> StoreResult<CodeReviewRecord> {
        let now = Utc::now();
        let record = CodeReviewRecord {
            id: uuidv7(),
            user_id: review.user_id,
            title: review.title.clone(),
            language: review.language.clone(),
            code: review.code.clone(),
            status: ReviewStatus::Pending,
            review_feedback: None,
            optimized_code: None,
            overall_score: None,
            created_at: now,
            updated_at: now,
        };
        self.reviews.insert(record.id, record.clone());
        Ok(record)
    }

    async fn complete(
        &self,
        id: Uuid,
        feedback: &ReviewFeedback,
    ) -> StoreResult<Option<CodeReviewRecord>> {
        Ok(self.finalize_with(id, |r| {
            r.review_feedback = Some(feedback.clone());
            r.optimized_code = Some(feedback.optimized_code.clone());
            r.overall_score = Some(feedback.overall_score);
            r.status = ReviewStatus::Completed;
        }))
    }

    async fn fail(&self, id: Uuid) -> StoreResult<Option<CodeReviewRecord>> {
        Ok(self.finalize_with(id, |r| r.status = ReviewStatus::Failed))
    }

    async fn find_for_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<CodeReviewRecord>> {
        Ok(self
            .reviews
            .get(&id)
            .filter(|r| r.user_id == user_id)
            .map(|r| r.clone()))
    }

    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<CodeReviewSummary>> {
        let mut items: Vec<CodeReviewSummary> = self
            .reviews
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| CodeReviewSummary::from(r.value()))
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    async fn fail_stale_pending(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut count = 0;
        for mut entry in self.reviews.iter_mut() {
            if entry.status == ReviewStatus::Pending && entry.created_at < cutoff {
                entry.status = ReviewStatus::Failed;
                entry.updated_at = Utc::now();
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn new_review(user_id: Uuid, title: &str) -> NewReview {
        NewReview {
            user_id,
            title: title.into(),
            language: "python".into(),
            code: "print('hello world')".into(),
        }
    }

    fn feedback(score: i32) -> ReviewFeedback {
        ReviewFeedback {
            summary: "ok".into(),
            overall_score: score,
            issues: vec![],
            strengths: vec!["clear".into()],
            improvements: vec![],
            optimized_code: "print('hi')".into(),
        }
    }

    #[tokio::test]
    async fn terminal_status_is_write_once() {
        let store = MemoryReviewStore::new();
        let rec = store.insert_pending(&new_review(Uuid::new_v4(), "t")).await.unwrap();
        assert!(store.fail(rec.id).await.unwrap().is_some());
        assert!(store.complete(rec.id, &feedback(90)).await.unwrap().is_none());
        assert!(store.fail(rec.id).await.unwrap().is_none());
        let stored = store.get(rec.id).unwrap();
        assert_eq!(stored.status, ReviewStatus::Failed);
        assert!(stored.overall_score.is_none());
    }

    #[tokio::test]
    async fn find_is_scoped_to_owner() {
        let store = MemoryReviewStore::new();
        let owner = Uuid::new_v4();
        let rec = store.insert_pending(&new_review(owner, "t")).await.unwrap();
        assert!(store.find_for_user(rec.id, owner).await.unwrap().is_some());
        assert!(
            store
                .find_for_user(rec.id, Uuid::new_v4())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn list_is_newest_first_and_per_user() {
        let store = MemoryReviewStore::new();
        let owner = Uuid::new_v4();
        let first = store.insert_pending(&new_review(owner, "first")).await.unwrap();
        let second = store.insert_pending(&new_review(owner, "second")).await.unwrap();
        store.insert_pending(&new_review(Uuid::new_v4(), "other")).await.unwrap();

        let list = store.list_by_user(owner).await.unwrap();
        let ids: Vec<Uuid> = list.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn stale_sweep_only_touches_old_pending() {
        let store = MemoryReviewStore::new();
        let owner = Uuid::new_v4();
        let done = store.insert_pending(&new_review(owner, "done")).await.unwrap();
        store.complete(done.id, &feedback(70)).await.unwrap();
        let stuck = store.insert_pending(&new_review(owner, "stuck")).await.unwrap();

        assert_eq!(
            store
                .fail_stale_pending(Utc::now() - Duration::hours(1))
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            store
                .fail_stale_pending(Utc::now() + Duration::seconds(1))
                .await
                .unwrap(),
            1
        );
        assert_eq!(store.get(stuck.id).unwrap().status, ReviewStatus::Failed);
        assert_eq!(store.get(done.id).unwrap().status, ReviewStatus::Completed);
    }
}
