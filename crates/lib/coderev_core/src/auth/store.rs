//! Storage seams for the session service.

use async_trait::async_trait;

use crate::db::StoreResult;
use crate::models::auth::{
    NewRefreshToken, NewUser, RefreshTokenRecord, RevokeOutcome, User, UserWithPassword,
};

/// Durable table of user identities and password digests.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch a user and digest by exact (case-sensitive) email.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserWithPassword>>;

    /// Check whether an email is already registered.
    async fn email_exists(&self, email: &str) -> StoreResult<bool>;

    /// Insert the identity and its first ledger row as one unit: either both
    /// rows exist afterwards or neither does. A duplicate email surfaces as
    /// `StoreError::UniqueViolation`.
    async fn create_user_with_session(
        &self,
        user: &NewUser,
        token: &NewRefreshToken,
    ) -> StoreResult<User>;
}

/// Append-mostly ledger of issued refresh tokens, keyed by token digest.
#[async_trait]
pub trait RefreshTokenLedger: Send + Sync {
    /// Append a non-revoked row. A digest collision is an integrity error.
    async fn record(&self, token: &NewRefreshToken) -> StoreResult<RefreshTokenRecord>;

    /// Return the row only if it is not revoked. Callers still check expiry.
    async fn find_active(&self, token_hash: &str) -> StoreResult<Option<RefreshTokenRecord>>;

    /// Flip `revoked` to true. Only one caller ever observes `Revoked` for a
    /// given digest.
    async fn revoke(&self, token_hash: &str) -> StoreResult<RevokeOutcome>;

    /// Revoke `presented_hash` and append `replacement` in one unit. Returns
    /// `None` without writing anything if the presented row is unknown,
    /// revoked or past its stored expiry.
    async fn rotate(
        &self,
        presented_hash: &str,
        replacement: &NewRefreshToken,
    ) -> StoreResult<Option<RefreshTokenRecord>>;
}
