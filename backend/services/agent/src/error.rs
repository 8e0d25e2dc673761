use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ctxwatch_common::error::CtxError;

pub struct ApiError(pub CtxError);

impl From<CtxError> for ApiError {
    fn from(err: CtxError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            CtxError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
