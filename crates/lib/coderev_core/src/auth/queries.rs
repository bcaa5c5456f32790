//! PostgreSQL implementation of the credential store and refresh token ledger.

use async_trait::async_trait;
use sqlx::PgPool;

use super::store::{CredentialStore, RefreshTokenLedger};
use crate::db::StoreResult;
use crate::models::auth::{
    NewRefreshToken, NewUser, RefreshTokenRecord, RevokeOutcome, User, UserWithPassword,
};
use crate::uuid::uuidv7;

const USER_COLUMNS: &str = "id, email, name, created_at, updated_at";
const TOKEN_COLUMNS: &str = "id, user_id, token_hash, expires_at, revoked, created_at";

/// Auth tables backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgAuthStore {
    pool: PgPool,
}

impl PgAuthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserPasswordRow {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

#[async_trait]
impl CredentialStore for PgAuthStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserWithPassword>> {
        let row = sqlx::query_as::<_, UserPasswordRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| UserWithPassword {
            user: r.user,
            password_hash: r.password_hash,
        }))
    }

    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_user_with_session(
        &self,
        user: &NewUser,
        token: &NewRefreshToken,
    ) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, name, password_hash) VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(uuidv7())
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }
}

#[async_trait]
impl RefreshTokenLedger for PgAuthStore {
    async fn record(&self, token: &NewRefreshToken) -> StoreResult<RefreshTokenRecord> {
        let row = sqlx::query_as::<_, RefreshTokenRecord>(&format!(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at) \
             VALUES ($1, $2, $3, $4) RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(uuidv7())
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_active(&self, token_hash: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        let row = sqlx::query_as::<_, RefreshTokenRecord>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM refresh_tokens \
             WHERE token_hash = $1 AND revoked = FALSE"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn revoke(&self, token_hash: &str) -> StoreResult<RevokeOutcome> {
        // The `revoked = FALSE` guard makes this a compare-and-swap.
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE \
             WHERE token_hash = $1 AND revoked = FALSE",
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() > 0 {
            return Ok(RevokeOutcome::Revoked);
        }

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM refresh_tokens WHERE token_hash = $1)",
        )
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(if exists {
            RevokeOutcome::AlreadyRevoked
        } else {
            RevokeOutcome::NotFound
        })
    }

    async fn rotate(
        &self,
        presented_hash: &str,
        replacement: &NewRefreshToken,
    ) -> StoreResult<Option<RefreshTokenRecord>> {
        let mut tx = self.pool.begin().await?;

        let revoked = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE \
             WHERE token_hash = $1 AND revoked = FALSE AND expires_at >= now()",
        )
        .bind(presented_hash)
        .execute(&mut *tx)
        .await?;

        if revoked.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let row = sqlx::query_as::<_, RefreshTokenRecord>(&format!(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at) \
             VALUES ($1, $2, $3, $4) RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(uuidv7())
        .bind(replacement.user_id)
        .bind(&replacement.token_hash)
        .bind(replacement.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(row))
    }
}
