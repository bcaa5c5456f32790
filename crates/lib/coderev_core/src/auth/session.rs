//! Session service: register, login, refresh, logout and access-token
//! authentication.

use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::jwt::{TokenIssuer, TokenKind};
use super::password::PasswordHasher;
use super::store::{CredentialStore, RefreshTokenLedger};
use super::SessionError;
use crate::db::StoreError;
use crate::models::auth::{
    AuthSession, LoginInput, NewRefreshToken, NewUser, RegisterInput, RevokeOutcome,
    TokenClaims, TokenPair, UserSummary,
};
use crate::uuid::uuidv4;
use crate::validation;

/// SHA-256 hex digest of a refresh token, the ledger's lookup key.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Orchestrates the credential store, ledger and token issuer.
#[derive(Clone)]
pub struct SessionService {
    credentials: Arc<dyn CredentialStore>,
    ledger: Arc<dyn RefreshTokenLedger>,
    issuer: Arc<TokenIssuer>,
    hasher: PasswordHasher,
    /// Digest checked when the email is unknown, built once at `hasher`'s cost.
    absent_user_digest: Arc<OnceCell<String>>,
}

/// Password behind `absent_user_digest`. Never matches a real account.
const ABSENT_USER_PASSWORD: &str = "coderev-absent-user";

/// Signed pair plus the ledger row to persist for the refresh half.
struct MintedPair {
    tokens: TokenPair,
    ledger_row: NewRefreshToken,
}

impl SessionService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        ledger: Arc<dyn RefreshTokenLedger>,
        issuer: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            credentials,
            ledger,
            issuer,
            hasher: PasswordHasher::default(),
            absent_user_digest: Arc::new(OnceCell::new()),
        }
    }

    /// Replace the password hasher (tests lower the bcrypt cost).
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self.absent_user_digest = Arc::new(OnceCell::new());
        self
    }

    /// Create an account and its first session.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthSession, SessionError> {
        let input = RegisterInput {
            email: email.trim().to_string(),
            password: password.to_string(),
            name: name.trim().to_string(),
        };
        validation::check(&input).map_err(SessionError::Validation)?;

        if self.credentials.email_exists(&input.email).await? {
            return Err(SessionError::AlreadyExists);
        }

        let password_hash = self.hasher.hash(&input.password).await?;
        let new_user = NewUser {
            id: uuidv4(),
            email: input.email,
            name: input.name,
            password_hash,
        };

        let minted = self.mint(new_user.id, &new_user.email)?;
        let user = match self
            .credentials
            .create_user_with_session(&new_user, &minted.ledger_row)
            .await
        {
            Ok(user) => user,
            // Lost a race with a concurrent registration of the same email.
            Err(StoreError::UniqueViolation(_)) => return Err(SessionError::AlreadyExists),
            Err(e) => return Err(e.into()),
        };

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(AuthSession {
            user: UserSummary::from(&user),
            tokens: minted.tokens,
        })
    }

    /// Authenticate with email + password and open an additional session.
    /// Unknown email and wrong password yield the same error.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, SessionError> {
        let input = LoginInput {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        validation::check(&input).map_err(SessionError::Validation)?;

        let Some(found) = self.credentials.find_user_by_email(&input.email).await? else {
            // Same bcrypt work as a wrong password.
            self.verify_absent_user(&input.password).await?;
            return Err(SessionError::InvalidCredentials);
        };
        if !self
            .hasher
            .verify(&input.password, &found.password_hash)
            .await?
        {
            return Err(SessionError::InvalidCredentials);
        }

        let minted = self.mint(found.user.id, &found.user.email)?;
        self.ledger.record(&minted.ledger_row).await?;

        info!(user_id = %found.user.id, "user logged in");
        Ok(AuthSession {
            user: UserSummary::from(&found.user),
            tokens: minted.tokens,
        })
    }

    /// Exchange a refresh token for a new pair, revoking the presented one.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        if refresh_token.trim().is_empty() {
            return Err(SessionError::Validation(
                "refreshToken: Refresh token is required".into(),
            ));
        }

        let claims = self
            .issuer
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|e| {
                debug!(error = %e, "refresh token rejected");
                SessionError::InvalidToken
            })?;

        let presented_hash = hash_refresh_token(refresh_token);
        let Some(stored) = self.ledger.find_active(&presented_hash).await? else {
            return Err(SessionError::InvalidToken);
        };
        if stored.user_id != claims.sub || stored.is_expired_at(Utc::now()) {
            return Err(SessionError::InvalidToken);
        }

        let minted = self.mint(claims.sub, &claims.email)?;
        // Only the first concurrent caller gets a row back.
        if self
            .ledger
            .rotate(&presented_hash, &minted.ledger_row)
            .await?
            .is_none()
        {
            return Err(SessionError::InvalidToken);
        }

        info!(user_id = %claims.sub, "refresh token rotated");
        Ok(minted.tokens)
    }

    /// Revoke a refresh token. Always succeeds from the caller's point of
    /// view; the revocation runs to completion even if the caller goes away.
    pub async fn logout(&self, refresh_token: Option<&str>) {
        let Some(token) = refresh_token.filter(|t| !t.trim().is_empty()) else {
            return;
        };
        let token_hash = hash_refresh_token(token);
        let ledger = Arc::clone(&self.ledger);

        let handle = tokio::spawn(async move {
            match ledger.revoke(&token_hash).await {
                Ok(RevokeOutcome::Revoked) => info!("user logged out, refresh token revoked"),
                Ok(outcome) => debug!(?outcome, "logout for inactive refresh token"),
                Err(e) => warn!(error = %e, "failed to revoke refresh token on logout"),
            }
        });
        if let Err(e) = handle.await {
            warn!(error = %e, "logout revocation task failed");
        }
    }

    /// Verify an access token. Stateless: the ledger is not consulted.
    pub fn authenticate(&self, access_token: &str) -> Result<TokenClaims, SessionError> {
        self.issuer
            .verify(access_token, TokenKind::Access)
            .map_err(|e| {
                debug!(error = %e, "access token rejected");
                SessionError::Unauthorized
            })
    }

    async fn verify_absent_user(&self, password: &str) -> Result<(), SessionError> {
        let digest = self
            .absent_user_digest
            .get_or_try_init(|| self.hasher.hash(ABSENT_USER_PASSWORD))
            .await?;
        self.hasher.verify(password, digest).await?;
        Ok(())
    }

    fn mint(&self, user_id: Uuid, email: &str) -> Result<MintedPair, SessionError> {
        let access = self
            .issuer
            .issue_access_token(user_id, email)
            .map_err(|e| SessionError::Internal(e.to_string()))?;
        let refresh = self
            .issuer
            .issue_refresh_token(user_id, email)
            .map_err(|e| SessionError::Internal(e.to_string()))?;
        let ledger_row = NewRefreshToken {
            user_id,
            token_hash: hash_refresh_token(&refresh.token),
            expires_at: refresh.expires_at,
        };
        Ok(MintedPair {
            tokens: TokenPair {
                access_token: access.token,
                refresh_token: refresh.token,
            },
            ledger_row,
        })
    }
}
