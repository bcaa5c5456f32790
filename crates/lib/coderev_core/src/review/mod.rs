//! Code review: the review store, the external analysis capability and the
//! pipeline that drives a record from `pending` to a terminal state.

pub mod analyzer;
pub mod chat;
pub mod memory;
pub mod pipeline;
pub mod queries;
pub mod store;

use thiserror::Error;
use uuid::Uuid;

use crate::db::StoreError;

pub use analyzer::{AnalysisError, AnalysisRequest, CodeAnalyzer};
pub use chat::{AnalyzerConfig, ChatCompletionsAnalyzer};
pub use pipeline::ReviewPipeline;
pub use store::ReviewStore;

/// Review errors.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Covers both a missing id and a record owned by someone else.
    #[error("Review not found")]
    NotFound,

    /// Analysis failed; the record was marked `failed` first.
    #[error("Code review {review_id} failed: {source}")]
    Pipeline {
        review_id: Uuid,
        #[source]
        source: AnalysisError,
    },

    /// The record left `pending` before this pipeline run could finalize it.
    #[error("Code review {0} was already finalized")]
    AlreadyFinalized(Uuid),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
