use axum::extract::{Query, State};
use chrono::Utc;

use crate::error::ApiError;
use crate::run::requests::RunQuery;
use crate::run::responses::RunResponse;
use crate::AppState;

pub async fn run_day(
    State(state): State<AppState>,
    Query(query): Query<RunQuery>,
) -> Result<RunResponse, ApiError> {
    let day = query.target_day(Utc::now(), state.report_offset)?;
    let options = query.options();
    tracing::info!(%day, dry_run = options.dry_run, "run requested");

    let cancel = state.shutdown.child_token();
    let result = state.runner.run_for_day(day, &options, &cancel).await;

    Ok(RunResponse(result))
}
