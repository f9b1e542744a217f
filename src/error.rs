// src/error.rs
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The model answered, but not in the shape the guidance flow requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("model reply is not a JSON object: {0}")]
    Malformed(String),

    #[error("model reply is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("model reply has an empty `{0}` list")]
    EmptyList(&'static str),

    #[error("model reply has a blank entry in `{field}` at index {index}")]
    BlankEntry { field: &'static str, index: usize },

    #[error("model reply has a blank disclaimer")]
    BlankDisclaimer,
}

/// The call to the hosted model itself failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("model request timed out")]
    Timeout,

    #[error("model transport error: {0}")]
    Transport(String),

    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model reply could not be decoded: {0}")]
    Decode(String),

    #[error("model returned no usable reply: {0}")]
    EmptyReply(String),
}

impl UpstreamError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::Timeout | UpstreamError::Transport(_) => true,
            UpstreamError::Status { status, .. } => *status == 429 || *status >= 500,
            UpstreamError::Decode(_) | UpstreamError::EmptyReply(_) => false,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssistantError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Assistant(AssistantError),
}

impl From<AssistantError> for AppError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::InvalidRequest(msg) => AppError::BadRequest(msg),
            other => AppError::Assistant(other),
        }
    }
}

// Malformed or mistyped request bodies are client errors like any other.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Assistant(AssistantError::InvalidRequest(_)) => {
                (StatusCode::BAD_REQUEST, "bad_request")
            }
            AppError::Assistant(AssistantError::Validation(_)) => {
                (StatusCode::BAD_GATEWAY, "validation")
            }
            AppError::Assistant(AssistantError::Upstream(UpstreamError::Timeout)) => {
                (StatusCode::GATEWAY_TIMEOUT, "upstream")
            }
            AppError::Assistant(AssistantError::Upstream(_)) => (StatusCode::BAD_GATEWAY, "upstream"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let body = Json(serde_json::json!({
            "error": kind,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
