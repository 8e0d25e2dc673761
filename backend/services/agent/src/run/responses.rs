use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ctxwatch_correlation::{RunResult, RunStatus};

/// A run result with its HTTP status derived from the run outcome.
#[derive(Debug)]
pub struct RunResponse(pub RunResult);

impl RunResponse {
    pub fn status_code(&self) -> StatusCode {
        match self.0.status {
            RunStatus::Success => StatusCode::OK,
            RunStatus::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            RunStatus::Failed => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RunResponse {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.0)).into_response()
    }
}
