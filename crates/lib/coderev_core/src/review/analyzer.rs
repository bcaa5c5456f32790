//! The external analysis capability and its prompt/response contract.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::review::ReviewFeedback;

/// Instructions sent as the system message. The reply must be a single JSON
/// object matching [`ReviewFeedback`].
pub const SYSTEM_PROMPT: &str = r#"You are a senior software engineer conducting a thorough code review.
Analyze the provided code and return structured, actionable feedback.

Respond with valid JSON only, matching exactly this structure:
{
  "summary": "Brief overall assessment (2-3 sentences)",
  "overallScore": <integer 0-100>,
  "issues": [
    {
      "severity": "critical" | "major" | "minor" | "info",
      "category": "Security" | "Performance" | "Readability" | "Maintainability" | "Bug" | "Best Practice",
      "line": <optional line number>,
      "title": "Short issue title",
      "description": "What the problem is",
      "suggestion": "How to fix it, with a concrete code example"
    }
  ],
  "strengths": ["What the code does well"],
  "improvements": ["High-level improvements to consider"],
  "optimizedCode": "<the complete rewritten code with every issue fixed>"
}

For optimizedCode, rewrite the entire input preserving its behavior, apply
every fix and improvement, and keep comments concise."#;

/// Failures of the analysis capability. Every variant routes the review to
/// `failed`.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis request failed: {0}")]
    Transport(String),

    #[error("analysis service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("analysis service returned no content")]
    EmptyResponse,

    #[error("analysis response rejected: {0}")]
    InvalidResponse(String),

    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),

    #[error("analyzer misconfigured: {0}")]
    Config(String),
}

/// What gets analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub language: String,
    pub code: String,
}

impl AnalysisRequest {
    /// The user message carrying the code.
    pub fn user_prompt(&self) -> String {
        format!(
            "Please review the following {lang} code:\n\n```{lang}\n{code}\n```",
            lang = self.language,
            code = self.code
        )
    }
}

/// External analysis capability, injected into the review pipeline.
#[async_trait]
pub trait CodeAnalyzer: Send + Sync {
    /// Analyze one snippet. Implementations return schema-checked feedback.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<ReviewFeedback, AnalysisError>;

    /// Identifier for logging.
    fn name(&self) -> &str;
}

/// Parse and check the JSON content of an analysis reply.
pub fn parse_feedback(content: &str) -> Result<ReviewFeedback, AnalysisError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }
    let feedback: ReviewFeedback = serde_json::from_str(content)
        .map_err(|e| AnalysisError::InvalidResponse(format!("not valid feedback JSON: {e}")))?;
    feedback.check().map_err(AnalysisError::InvalidResponse)?;
    Ok(feedback)
}
