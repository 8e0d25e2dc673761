pub mod anomaly;
pub mod context;
pub mod decision;

use ctxwatch_common::error::{CtxError, CtxResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Create a Postgres connection pool from a database URL.
///
/// The pool is created once per process and shared by every repository.
pub async fn create_pool(database_url: &str, max_connections: u32) -> CtxResult<PgPool> {
    tracing::info!(max_connections, "connecting to database");
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| CtxError::Database(e.to_string()))
}
