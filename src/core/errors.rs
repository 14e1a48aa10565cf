use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

/// Failures inside one conversational turn.
///
/// `EmptyTranscript` and `MissingQuestion` indicate a sequencing bug in the
/// caller (the three pipeline steps were not run in order); `Generation`
/// wraps an answer-engine failure. None of these ever roll back turns that
/// were already appended.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("transcript has no turns")]
    EmptyTranscript,
    #[error("last turn has no question to answer")]
    MissingQuestion,
    #[error("answer generation failed: {0}")]
    Generation(#[source] ApiError),
}
