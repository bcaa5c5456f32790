//! Password hashing via bcrypt.

use super::SessionError;

/// bcrypt cost factor used in production.
pub const DEFAULT_COST: u32 = 10;

/// Salted bcrypt hashing. Work runs on the blocking pool so the async
/// executor is not stalled by the key schedule.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    /// Hasher with an explicit cost. Tests use the bcrypt minimum (4).
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password.
    pub async fn hash(&self, password: &str) -> Result<String, SessionError> {
        let password = password.to_string();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| SessionError::Internal(format!("bcrypt task: {e}")))?
            .map_err(|e| SessionError::Internal(format!("bcrypt hash: {e}")))
    }

    /// Verify a password against a bcrypt digest.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, SessionError> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| SessionError::Internal(format!("bcrypt task: {e}")))?
            .map_err(|e| SessionError::Internal(format!("bcrypt verify: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = PasswordHasher::with_cost(4);
        let digest = hasher.hash("pw123456").await.unwrap();
        assert_ne!(digest, "pw123456");
        assert!(hasher.verify("pw123456", &digest).await.unwrap());
        assert!(!hasher.verify("wrong", &digest).await.unwrap());
    }

    #[tokio::test]
    async fn hashes_are_salted() {
        let hasher = PasswordHasher::with_cost(4);
        let a = hasher.hash("same-password").await.unwrap();
        let b = hasher.hash("same-password").await.unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn default_cost_is_production_strength() {
        assert!(PasswordHasher::default().cost >= 10);
    }
}
