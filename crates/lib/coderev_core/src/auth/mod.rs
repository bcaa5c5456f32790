//! Authentication: token issuing, password hashing, the credential store,
//! the refresh token ledger and the session service that ties them together.

pub mod jwt;
pub mod memory;
pub mod password;
pub mod queries;
pub mod session;
pub mod store;

use thiserror::Error;

use crate::db::StoreError;

pub use jwt::{TokenError, TokenIssuer, TokenKind};
pub use password::PasswordHasher;
pub use session::SessionService;
pub use store::{CredentialStore, RefreshTokenLedger};

/// Session errors. `InvalidCredentials` and `InvalidToken` are deliberately
/// undifferentiated so callers cannot probe for accounts or token state.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User with this email already exists")]
    AlreadyExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Refresh token is invalid or expired")]
    InvalidToken,

    #[error("Invalid or expired access token")]
    Unauthorized,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
