//! API server configuration.

use coderev_core::auth::jwt::resolve_secret;
use coderev_core::review::AnalyzerConfig;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:5000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Access token signing secret.
    pub access_token_secret: String,
    /// Refresh token signing secret. Must differ from the access secret.
    pub refresh_token_secret: String,
    /// Allowed CORS origin. `None` allows any origin.
    pub frontend_url: Option<String>,
    /// Analysis endpoint settings.
    pub analyzer: AnalyzerConfig,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable               | Default                                 |
    /// |------------------------|-----------------------------------------|
    /// | `BIND_ADDR`            | `127.0.0.1:5000`                        |
    /// | `DATABASE_URL`         | `postgres://localhost:5432/coderev`     |
    /// | `ACCESS_TOKEN_SECRET`  | generated & persisted to file           |
    /// | `REFRESH_TOKEN_SECRET` | generated & persisted to file           |
    /// | `FRONTEND_URL`         | unset (any origin)                      |
    ///
    /// Analyzer variables are read by [`AnalyzerConfig::from_env`].
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/coderev".into()),
            access_token_secret: resolve_secret("ACCESS_TOKEN_SECRET", "access-token-secret"),
            refresh_token_secret: resolve_secret("REFRESH_TOKEN_SECRET", "refresh-token-secret"),
            frontend_url: std::env::var("FRONTEND_URL").ok().filter(|u| !u.is_empty()),
            analyzer: AnalyzerConfig::from_env(),
        }
    }
}
