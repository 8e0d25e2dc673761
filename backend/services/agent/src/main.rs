mod error;
mod run;
mod vertex;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{routing::get, Json, Router};
use chrono::FixedOffset;
use ctxwatch_common::types::ServiceInfo;
use ctxwatch_config::{init_tracing, AppConfig};
use ctxwatch_correlation::{BatchRunner, ClassifierConfig, RunnerConfig, SemanticClassifier};
use ctxwatch_db::anomaly::pg_repository::PgAnomalyRepository;
use ctxwatch_db::context::pg_repository::PgContextRepository;
use ctxwatch_db::decision::pg_repository::PgDecisionRepository;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::run::DayRunner;
use crate::vertex::client::{VertexClient, VertexClientConfig};

const SERVICE_NAME: &str = "ctxwatch-agent";
const DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<dyn DayRunner>,
    pub report_offset: FixedOffset,
    /// Root token; each run gets a child so shutdown reaches every in-flight run.
    pub shutdown: CancellationToken,
}

async fn root() -> &'static str {
    "context agent running"
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn info() -> Json<ServiceInfo> {
    Json(ServiceInfo::new(SERVICE_NAME, env!("CARGO_PKG_VERSION")))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/info", get(info))
        .merge(run::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal(token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
    tracing::info!("shutdown signal received, cancelling in-flight runs");
    token.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing("info");

    let config = AppConfig::from_env().context("failed to load config")?;
    tracing::info!(service = SERVICE_NAME, "starting");

    let report_offset = config.report_offset()?;
    let min_severity = config.min_severity;

    let vertex_config = VertexClientConfig::from_env()
        .map_err(anyhow::Error::msg)?
        .context("VERTEX_PROJECT_ID must be set to run the context agent")?;
    tracing::info!(
        project = %vertex_config.project_id,
        location = %vertex_config.location,
        model = %vertex_config.model,
        "model transport configured"
    );
    let transport = VertexClient::new(vertex_config).context("failed to build HTTP client")?;

    let classifier = SemanticClassifier::new(
        transport,
        ClassifierConfig {
            timeout: Duration::from_secs(config.classifier_timeout_secs),
            max_output_tokens: config.classifier_max_output_tokens,
            context_char_budget: config.context_char_budget,
        },
    );

    let pool = ctxwatch_db::create_pool(&config.database_url, DB_MAX_CONNECTIONS)
        .await
        .context("failed to create database pool")?;

    let runner = BatchRunner::new(
        PgAnomalyRepository::new(pool.clone()).with_min_severity(min_severity),
        PgContextRepository::new(pool.clone()),
        PgDecisionRepository::new(pool),
        classifier,
        RunnerConfig {
            concurrency: config.classifier_concurrency,
        },
    );

    let shutdown = CancellationToken::new();
    let state = AppState {
        runner: Arc::new(runner),
        report_offset,
        shutdown: shutdown.clone(),
    };

    let app = build_router(state);
    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .context("invalid bind address")?;

    tracing::info!(%addr, %min_severity, "listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind")?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("server error")?;

    tracing::info!("shut down cleanly");
    Ok(())
}
