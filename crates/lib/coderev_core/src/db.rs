//! Storage error type shared by every store implementation.

use thiserror::Error;

/// PostgreSQL SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Errors surfaced by the credential store, the refresh token ledger and the
/// review store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Db(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e
            && db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
        {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            return StoreError::UniqueViolation(constraint);
        }
        StoreError::Db(e)
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
