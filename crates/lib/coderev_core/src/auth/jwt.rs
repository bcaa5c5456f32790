//! JWT token issuing and verification.
//!
//! Access and refresh tokens are HS256 JWTs signed with two independent
//! secrets, so a leaked refresh secret cannot mint access tokens and vice
//! versa. Verification is pure: no storage access.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::auth::TokenClaims;
use crate::uuid::uuidv4;

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;

/// Refresh token lifetime: 7 days.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Which of the two signing keys a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Token verification and signing failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("malformed token")]
    Malformed,

    #[error("signing key misconfigured: {0}")]
    Signing(String),
}

/// A signed token together with the expiry baked into it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Issues and verifies access and refresh tokens.
pub struct TokenIssuer {
    access: KeyPair,
    refresh: KeyPair,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl TokenIssuer {
    /// Build an issuer from the two secrets. Empty or identical secrets are
    /// a misconfiguration.
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Result<Self, TokenError> {
        if access_secret.is_empty() || refresh_secret.is_empty() {
            return Err(TokenError::Signing("secret must not be empty".into()));
        }
        if access_secret == refresh_secret {
            return Err(TokenError::Signing(
                "access and refresh secrets must differ".into(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Ok(Self {
            access: KeyPair::from_secret(access_secret),
            refresh: KeyPair::from_secret(refresh_secret),
            access_ttl: Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            refresh_ttl: Duration::days(REFRESH_TOKEN_TTL_DAYS),
            validation,
        })
    }

    /// Override token lifetimes.
    pub fn with_lifetimes(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    /// Sign a 15-minute access token for `user_id`.
    pub fn issue_access_token(&self, user_id: Uuid, email: &str) -> Result<IssuedToken, TokenError> {
        self.issue(TokenKind::Access, user_id, email)
    }

    /// Sign a 7-day refresh token for `user_id`.
    pub fn issue_refresh_token(
        &self,
        user_id: Uuid,
        email: &str,
    ) -> Result<IssuedToken, TokenError> {
        self.issue(TokenKind::Refresh, user_id, email)
    }

    /// Verify signature and expiry against the key for `kind`.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, TokenError> {
        decode::<TokenClaims>(token, &self.keys(kind).decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }

    fn issue(&self, kind: TokenKind, user_id: Uuid, email: &str) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let expires_at = now + ttl;
        let claims = TokenClaims {
            sub: user_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuidv4(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.keys(kind).encoding)
            .map_err(|e| TokenError::Signing(format!("jwt encode: {e}")))?;
        Ok(IssuedToken { token, expires_at })
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}

/// Resolve a signing secret: env var `env_var` → persisted file → newly
/// generated secret (persisted for the next start).
pub fn resolve_secret(env_var: &str, file_name: &str) -> String {
    if let Ok(secret) = std::env::var(env_var)
        && !secret.is_empty()
    {
        return secret;
    }
    let secret_path = secret_path(file_name);
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), env_var, "generated new signing secret");
    secret
}

fn secret_path(file_name: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("coderev")
        .join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"access-secret", b"refresh-secret").unwrap()
    }

    #[test]
    fn access_token_round_trip() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let issued = issuer.issue_access_token(user_id, "a@x.com").unwrap();
        let claims = issuer.verify(&issued.token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_TTL_SECS);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn refresh_token_lives_seven_days() {
        let issuer = issuer();
        let issued = issuer.issue_refresh_token(Uuid::new_v4(), "a@x.com").unwrap();
        let claims = issuer.verify(&issued.token, TokenKind::Refresh).unwrap();
        assert_eq!(claims.exp - claims.iat, REFRESH_TOKEN_TTL_DAYS * 24 * 3600);
    }

    #[test]
    fn keys_are_not_interchangeable() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let access = issuer.issue_access_token(user_id, "a@x.com").unwrap();
        let refresh = issuer.issue_refresh_token(user_id, "a@x.com").unwrap();
        assert_eq!(
            issuer.verify(&access.token, TokenKind::Refresh),
            Err(TokenError::InvalidSignature)
        );
        assert_eq!(
            issuer.verify(&refresh.token, TokenKind::Access),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = issuer().with_lifetimes(Duration::seconds(-30), Duration::seconds(-30));
        let issued = issuer.issue_access_token(Uuid::new_v4(), "a@x.com").unwrap();
        assert_eq!(
            issuer.verify(&issued.token, TokenKind::Access),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(
            issuer().verify("not-a-jwt", TokenKind::Access),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn same_second_tokens_are_distinct() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let a = issuer.issue_refresh_token(user_id, "a@x.com").unwrap();
        let b = issuer.issue_refresh_token(user_id, "a@x.com").unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn rejects_shared_or_empty_secrets() {
        assert!(matches!(
            TokenIssuer::new(b"same", b"same"),
            Err(TokenError::Signing(_))
        ));
        assert!(matches!(
            TokenIssuer::new(b"", b"other"),
            Err(TokenError::Signing(_))
        ));
    }

    #[test]
    fn resolve_secret_prefers_env() {
        // SAFETY: test-local variable name, not read by any other test.
        unsafe { std::env::set_var("CODEREV_TEST_SECRET_ENV", "from-env") };
        assert_eq!(resolve_secret("CODEREV_TEST_SECRET_ENV", "unused"), "from-env");
    }
}
