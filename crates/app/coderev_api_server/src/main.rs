//! Coderev API server binary.
//!
//! Serves the REST API and runs the stale-review sweeper until Ctrl-C.

use std::time::Duration;

use clap::Parser;
use coderev_api::AppState;
use coderev_api::config::ApiConfig;
use coderev_core::review::ReviewPipeline;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "coderev_api_server", about = "Coderev AI code review API server")]
struct Args {
    /// Port to listen on. Overrides the port in `BIND_ADDR`.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// PostgreSQL connection URL. Overrides `DATABASE_URL` from the config.
    #[arg(long)]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep users, tokens and reviews in process memory instead of PostgreSQL.
    #[arg(long, default_value_t = false)]
    in_memory: bool,

    /// Reviews still pending after this many seconds are marked failed.
    /// Must exceed the analysis timeout.
    #[arg(long, default_value_t = 600)]
    stale_review_secs: u64,

    /// How often the stale-review sweeper runs.
    #[arg(long, default_value_t = 60)]
    sweep_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,coderev_api=debug,coderev_core=debug".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = ApiConfig::from_env();
    if let Some(port) = args.port {
        config.bind_addr = with_port(&config.bind_addr, port);
    }
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    if config.analyzer.api_key.is_none() {
        warn!("GROQ_API_KEY is not set; every review submission will fail");
    }

    info!(
        bind_addr = %config.bind_addr,
        in_memory = args.in_memory,
        analyzer = ?config.analyzer,
        "starting coderev_api_server"
    );

    let state = if args.in_memory {
        AppState::in_memory(config.clone())?
    } else {
        info!(max_connections = args.max_connections, "configuring connection pool");
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.database_url)
            .await?;

        info!("running database migrations");
        coderev_api::migrate(&pool).await?;

        AppState::with_postgres(pool, config.clone())?
    };

    let stale_after = check_stale_age(
        Duration::from_secs(args.stale_review_secs),
        state.reviews.analysis_timeout(),
    )?;

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(sweep_stale_reviews(
        state.reviews.clone(),
        stale_after,
        Duration::from_secs(args.sweep_interval_secs.max(1)),
        shutdown.clone(),
    ));

    let app = coderev_api::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    let api_result = axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
                    _ = shutdown.cancelled() => {}
                }
            }
        })
        .await;

    shutdown.cancel();
    let _ = sweeper.await;

    api_result?;
    Ok(())
}

/// Periodically fail reviews stuck in `pending`.
async fn sweep_stale_reviews(
    reviews: ReviewPipeline,
    max_age: Duration,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = reviews.reconcile_stale(max_age).await {
                    warn!(error = %e, "stale review sweep failed");
                }
            }
        }
    }
}

/// The sweeper may only fail reviews older than any in-flight analysis.
fn check_stale_age(stale_after: Duration, analysis_timeout: Duration) -> Result<Duration, String> {
    if stale_after <= analysis_timeout {
        return Err(format!(
            "--stale-review-secs ({}) must exceed the analysis timeout ({}s)",
            stale_after.as_secs(),
            analysis_timeout.as_secs()
        ));
    }
    Ok(stale_after)
}

/// Replace the port of a `host:port` address.
fn with_port(bind_addr: &str, port: u16) -> String {
    let host = bind_addr
        .rsplit_once(':')
        .map(|(host, _)| host)
        .unwrap_or(bind_addr);
    format!("{host}:{port}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_override_keeps_host() {
        assert_eq!(with_port("127.0.0.1:5000", 8080), "127.0.0.1:8080");
        assert_eq!(with_port("0.0.0.0:5000", 0), "0.0.0.0:0");
        assert_eq!(with_port("localhost", 9000), "localhost:9000");
    }

    #[test]
    fn stale_age_must_exceed_analysis_timeout() {
        let analysis = Duration::from_secs(90);
        assert!(check_stale_age(Duration::from_secs(30), analysis).is_err());
        assert!(check_stale_age(Duration::from_secs(90), analysis).is_err());
        assert_eq!(
            check_stale_age(Duration::from_secs(600), analysis),
            Ok(Duration::from_secs(600))
        );
    }

    #[test]
    fn default_stale_age_passes_the_pipeline_bound() {
        let args = Args::parse_from(["coderev_api_server"]);
        let bound = coderev_core::review::pipeline::DEFAULT_ANALYSIS_TIMEOUT;
        assert!(check_stale_age(Duration::from_secs(args.stale_review_secs), bound).is_ok());
    }

    #[test]
    fn args_parse_defaults() {
        let args = Args::parse_from(["coderev_api_server", "--in-memory"]);
        assert!(args.in_memory);
        assert_eq!(args.stale_review_secs, 600);
        assert_eq!(args.sweep_interval_secs, 60);
        assert_eq!(args.max_connections, 5);
    }
}
