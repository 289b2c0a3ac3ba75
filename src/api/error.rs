//! Mapping of service failures onto HTTP responses.
//!
//! Every error body is `{error, message, field?, retryable}`. Storage and
//! unknown failures are logged in full and reported with a generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::generation::services::{ErrorClass, OrchestrationError};

/// Failure returned by an HTTP handler.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed or unknown bearer token.
    #[error("authentication required")]
    Unauthenticated,

    /// The body could not be decoded as JSON.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// The path does not name a task.
    #[error("task not found: {0}")]
    MalformedTaskId(String),

    /// A query parameter was not understood.
    #[error("invalid query parameter {field}: {message}")]
    InvalidQuery {
        /// Offending parameter.
        field: &'static str,
        /// Explanation.
        message: String,
    },

    /// The service rejected or failed the request.
    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),
}

/// Serialized error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable code.
    pub error: &'static str,
    /// Human-readable explanation.
    pub message: String,
    /// Offending request field, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    /// Whether retrying the unchanged request may succeed.
    pub retryable: bool,
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::InvalidBody(_) | Self::InvalidQuery { .. } => StatusCode::BAD_REQUEST,
            Self::MalformedTaskId(_) => StatusCode::NOT_FOUND,
            Self::Orchestration(err) => orchestration_status(err),
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            Self::Unauthenticated => ErrorBody {
                error: "UNAUTHORIZED",
                message: self.to_string(),
                field: None,
                retryable: false,
            },
            Self::InvalidBody(_) => ErrorBody {
                error: "INVALID_REQUEST_BODY",
                message: self.to_string(),
                field: None,
                retryable: false,
            },
            Self::MalformedTaskId(_) => ErrorBody {
                error: "TASK_NOT_FOUND",
                message: self.to_string(),
                field: None,
                retryable: false,
            },
            Self::InvalidQuery { field, message } => ErrorBody {
                error: "INVALID_QUERY",
                message: message.clone(),
                field: Some(field),
                retryable: false,
            },
            Self::Orchestration(err) => ErrorBody {
                error: err.code(),
                message: match err.class() {
                    ErrorClass::Persistence | ErrorClass::Unknown => {
                        "internal server error".to_owned()
                    }
                    _ => err.to_string(),
                },
                field: err.field(),
                retryable: err.is_retryable(),
            },
        }
    }
}

const fn orchestration_status(err: &OrchestrationError) -> StatusCode {
    match err {
        OrchestrationError::ConcurrentLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        OrchestrationError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
        OrchestrationError::Provider(_) => StatusCode::SERVICE_UNAVAILABLE,
        OrchestrationError::Validation(_) | OrchestrationError::ExtensionRejected(_) => {
            StatusCode::BAD_REQUEST
        }
        OrchestrationError::SourceNotFound
        | OrchestrationError::TaskNotFound(_)
        | OrchestrationError::UnknownOperation(_) => StatusCode::NOT_FOUND,
        OrchestrationError::CancellationRejected { .. }
        | OrchestrationError::StateTransition(_) => StatusCode::CONFLICT,
        OrchestrationError::ChargeTimeout
        | OrchestrationError::Persistence(_)
        | OrchestrationError::Identity(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
