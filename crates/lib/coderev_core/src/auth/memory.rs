//! In-process credential store and ledger.
//!
//! A single mutex guards users and tokens together, which gives
//! `create_user_with_session` and `rotate` the same all-or-nothing behavior
//! as the PostgreSQL transactions. Used by tests and by the server's
//! `--in-memory` mode.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::store::{CredentialStore, RefreshTokenLedger};
use crate::db::{StoreError, StoreResult};
use crate::models::auth::{
    NewRefreshToken, NewUser, RefreshTokenRecord, RevokeOutcome, User, UserWithPassword,
};
use crate::uuid::uuidv7;

#[derive(Default)]
struct AuthTables {
    users: HashMap<Uuid, UserWithPassword>,
    emails: HashMap<String, Uuid>,
    tokens: HashMap<String, RefreshTokenRecord>,
}

impl AuthTables {
    fn insert_token(&mut self, token: &NewRefreshToken) -> StoreResult<RefreshTokenRecord> {
        if self.tokens.contains_key(&token.token_hash) {
            return Err(StoreError::UniqueViolation(
                "refresh_tokens_token_hash_key".into(),
            ));
        }
        if !self.users.contains_key(&token.user_id) {
            return Err(StoreError::Corrupt(format!(
                "refresh token owner {} does not exist",
                token.user_id
            )));
        }
        let record = RefreshTokenRecord {
            id: uuidv7(),
            user_id: token.user_id,
            token_hash: token.token_hash.clone(),
            expires_at: token.expires_at,
            revoked: false,
            created_at: Utc::now(),
        };
        self.tokens.insert(record.token_hash.clone(), record.clone());
        Ok(record)
    }
}

/// Auth tables held in memory.
#[derive(Default)]
pub struct MemoryAuthStore {
    tables: Mutex<AuthTables>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ledger rows owned by `user_id` (revoked or not).
    pub async fn token_count(&self, user_id: Uuid) -> usize {
        let tables = self.tables.lock().await;
        tables.tokens.values().filter(|t| t.user_id == user_id).count()
    }
}

#[async_trait]
impl CredentialStore for MemoryAuthStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserWithPassword>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .emails
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        Ok(self.tables.lock().await.emails.contains_key(email))
    }

    async fn create_user_with_session(
        &self,
        user: &NewUser,
        token: &NewRefreshToken,
    ) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.emails.contains_key(&user.email) {
            return Err(StoreError::UniqueViolation("users_email_key".into()));
        }
        if tables.tokens.contains_key(&token.token_hash) {
            return Err(StoreError::UniqueViolation(
                "refresh_tokens_token_hash_key".into(),
            ));
        }

        let now = Utc::now();
        let created = User {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(
            user.id,
            UserWithPassword {
                user: created.clone(),
                password_hash: user.password_hash.clone(),
            },
        );
        tables.emails.insert(user.email.clone(), user.id);
        tables.insert_token(token)?;
        Ok(created)
    }
}

#[async_trait]
impl RefreshTokenLedger for MemoryAuthStore {
    async fn record(&self, token: &NewRefreshToken) -> StoreResult<RefreshTokenRecord> {
        self.tables.lock().await.insert_token(token)
    }

    async fn find_active(&self, token_hash: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.tokens.get(token_hash).filter(|t| !t.revoked).cloned())
    }

    async fn revoke(&self, token_hash: &str) -> StoreResult<RevokeOutcome> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.tokens.get_mut(token_hash) {
            None => RevokeOutcome::NotFound,
            Some(t) if t.revoked => RevokeOutcome::AlreadyRevoked,
            Some(t) => {
                t.revoked = true;
                RevokeOutcome::Revoked
            }
        })
    }

    async fn rotate(
        &self,
        presented_hash: &str,
        replacement: &NewRefreshToken,
    ) -> StoreResult<Option<RefreshTokenRecord>> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        match tables.tokens.get(presented_hash) {
            Some(t) if !t.revoked && !t.is_expired_at(now) => {}
            _ => return Ok(None),
        }
        if tables.tokens.contains_key(&replacement.token_hash) {
            return Err(StoreError::UniqueViolation(
                "refresh_tokens_token_hash_key".into(),
            ));
        }
        if let Some(t) = tables.tokens.get_mut(presented_hash) {
            t.revoked = true;
        }
        tables.insert_token(replacement).map(Some)
    }
}
