pub mod handlers;
pub mod requests;
pub mod responses;

use async_trait::async_trait;
use axum::routing::post;
use axum::Router;
use chrono::NaiveDate;
use ctxwatch_correlation::{BatchRunner, Classifier, RunOptions, RunResult};
use ctxwatch_db::anomaly::repositories::AnomalyRepository;
use ctxwatch_db::context::repositories::ContextRepository;
use ctxwatch_db::decision::repositories::DecisionRepository;
use tokio_util::sync::CancellationToken;

use crate::AppState;

/// Object-safe view of a runner so handlers don't carry its collaborator types.
#[async_trait]
pub trait DayRunner: Send + Sync {
    async fn run_for_day(
        &self,
        day: NaiveDate,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> RunResult;
}

#[async_trait]
impl<A, C, D, K> DayRunner for BatchRunner<A, C, D, K>
where
    A: AnomalyRepository + 'static,
    C: ContextRepository + 'static,
    D: DecisionRepository + 'static,
    K: Classifier + 'static,
{
    async fn run_for_day(
        &self,
        day: NaiveDate,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> RunResult {
        BatchRunner::run_for_day(self, day, options, cancel).await
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/run", post(handlers::run_day))
}
