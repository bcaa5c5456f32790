//! Code review domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Lifecycle state of a review record. `Pending` is only ever the initial
/// state; `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Completed,
    Failed,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Completed => "completed",
            ReviewStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReviewStatus::Pending)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "completed" => Ok(ReviewStatus::Completed),
            "failed" => Ok(ReviewStatus::Failed),
            other => Err(format!("unknown review status: {other}")),
        }
    }
}

/// Issue severity reported by the analysis capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Info,
}

/// One finding in the structured feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewIssue {
    pub severity: Severity,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub title: String,
    pub description: String,
    pub suggestion: String,
}

/// Structured feedback produced by the analysis capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFeedback {
    #[serde(default)]
    pub summary: String,
    pub overall_score: i32,
    #[serde(default)]
    pub issues: Vec<ReviewIssue>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    pub optimized_code: String,
}

impl ReviewFeedback {
    /// Semantic checks serde cannot express.
    pub fn check(&self) -> Result<(), String> {
        if !(0..=100).contains(&self.overall_score) {
            return Err(format!(
                "overallScore {} outside 0..=100",
                self.overall_score
            ));
        }
        if self.optimized_code.trim().is_empty() {
            return Err("optimizedCode is empty".to_string());
        }
        Ok(())
    }
}

/// Full review record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeReviewRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub language: String,
    pub code: String,
    pub status: ReviewStatus,
    pub review_feedback: Option<ReviewFeedback>,
    pub optimized_code: Option<String>,
    pub overall_score: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List projection without the code and feedback bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeReviewSummary {
    pub id: Uuid,
    pub title: String,
    pub language: String,
    pub overall_score: Option<i32>,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&CodeReviewRecord> for CodeReviewSummary {
    fn from(r: &CodeReviewRecord) -> Self {
        Self {
            id: r.id,
            title: r.title.clone(),
            language: r.language.clone(),
            overall_score: r.overall_score,
            status: r.status,
            created_at: r.created_at,
        }
    }
}

/// Review submission, validated before the pending row is written.
#[derive(Debug, Clone, Validate)]
pub struct NewReview {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 50, message = "Language must be 1-50 characters"))]
    pub language: String,
    #[validate(length(min = 10, message = "Code must be at least 10 characters"))]
    pub code: String,
}
