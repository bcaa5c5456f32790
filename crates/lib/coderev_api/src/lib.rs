//! # coderev_api
//!
//! HTTP API library for Coderev.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use coderev_core::auth::memory::MemoryAuthStore;
use coderev_core::auth::queries::PgAuthStore;
use coderev_core::auth::{SessionService, TokenIssuer};
use coderev_core::review::memory::MemoryReviewStore;
use coderev_core::review::queries::PgReviewStore;
use coderev_core::review::{ChatCompletionsAnalyzer, CodeAnalyzer, ReviewPipeline};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ApiConfig;
use crate::error::StartupError;
use crate::handlers::{auth, health, reviews};

/// Request bodies larger than this are rejected with 413.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Register, login, refresh, logout and token verification.
    pub sessions: SessionService,
    /// Review submission and retrieval.
    pub reviews: ReviewPipeline,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Wire services over PostgreSQL-backed stores.
    pub fn with_postgres(pool: PgPool, config: ApiConfig) -> Result<Self, StartupError> {
        let auth_store = Arc::new(PgAuthStore::new(pool.clone()));
        let review_store = Arc::new(PgReviewStore::new(pool));
        let issuer = Arc::new(TokenIssuer::new(
            config.access_token_secret.as_bytes(),
            config.refresh_token_secret.as_bytes(),
        )?);
        let analyzer: Arc<dyn CodeAnalyzer> =
            Arc::new(ChatCompletionsAnalyzer::new(config.analyzer.clone())?);

        Ok(Self {
            sessions: SessionService::new(auth_store.clone(), auth_store, issuer),
            reviews: ReviewPipeline::new(review_store, analyzer),
            config,
        })
    }

    /// Wire services over in-process stores. Nothing survives a restart.
    pub fn in_memory(config: ApiConfig) -> Result<Self, StartupError> {
        let analyzer: Arc<dyn CodeAnalyzer> =
            Arc::new(ChatCompletionsAnalyzer::new(config.analyzer.clone())?);
        Self::in_memory_with_analyzer(config, analyzer)
    }

    /// In-process stores with a caller-supplied analyzer.
    pub fn in_memory_with_analyzer(
        config: ApiConfig,
        analyzer: Arc<dyn CodeAnalyzer>,
    ) -> Result<Self, StartupError> {
        let auth_store = Arc::new(MemoryAuthStore::new());
        let issuer = Arc::new(TokenIssuer::new(
            config.access_token_secret.as_bytes(),
            config.refresh_token_secret.as_bytes(),
        )?);

        Ok(Self {
            sessions: SessionService::new(auth_store.clone(), auth_store, issuer),
            reviews: ReviewPipeline::new(Arc::new(MemoryReviewStore::new()), analyzer),
            config,
        })
    }
}

/// Run embedded database migrations.
///
/// Delegates to `coderev_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    coderev_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(state.config.frontend_url.as_deref());

    // Public routes (no auth required)
    let public = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/refresh", post(auth::refresh_handler))
        .route("/api/auth/logout", post(auth::logout_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route("/api/auth/me", get(auth::me_handler))
        .route(
            "/api/reviews",
            post(reviews::submit_handler).get(reviews::list_handler),
        )
        .route("/api/reviews/{id}", get(reviews::get_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(frontend_url: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match frontend_url.map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(e)) => {
            warn!(error = %e, "FRONTEND_URL is not a valid origin, allowing any origin");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}
