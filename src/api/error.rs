//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::confirmation::{BufferError, CommitError};
use crate::core_state::CoreError;
use crate::pipeline::validation::{IssueDetail, ItemFailure, ValidationError};
use crate::pipeline::ExtractionError;
use crate::session::SessionError;
use crate::store::StoreError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Client-facing text for store failures; the cause is only logged.
const PERSISTENCE_MESSAGE: &str = "Pantry store operation failed";

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("File access: {0}")]
    FileAccess(String),
    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),
    #[error("Extraction format: {0}")]
    ExtractionFormat(String),
    #[error("Extraction parse: {0}")]
    ExtractionParse(String),
    #[error("Extraction unavailable: {0}")]
    ExtractionUnavailable(String),
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        details: serde_json::Value,
    },
    #[error("Incomplete batch: {message}")]
    IncompleteBatch {
        message: String,
        details: serde_json::Value,
    },
    #[error("Owner not found: {0}")]
    OwnerNotFound(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// Carries the store's own message for logging; clients never see it.
    #[error("Pantry store operation failed")]
    Persistence(String),
    #[error("An internal error occurred")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            ApiError::FileAccess(detail) => (StatusCode::BAD_REQUEST, "FILE_ACCESS", detail, None),
            ApiError::UnsupportedMedia(detail) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_MEDIA",
                detail,
                None,
            ),
            ApiError::ExtractionFormat(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EXTRACTION_FORMAT",
                detail,
                None,
            ),
            ApiError::ExtractionParse(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EXTRACTION_PARSE",
                detail,
                None,
            ),
            ApiError::ExtractionUnavailable(detail) => {
                (StatusCode::BAD_GATEWAY, "EXTRACTION_UNAVAILABLE", detail, None)
            }
            ApiError::Validation { message, details } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION",
                message,
                Some(details),
            ),
            ApiError::IncompleteBatch { message, details } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INCOMPLETE_BATCH",
                message,
                Some(details),
            ),
            ApiError::OwnerNotFound(owner_id) => (
                StatusCode::NOT_FOUND,
                "OWNER_NOT_FOUND",
                format!("Owner not found: {owner_id}"),
                None,
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail, None),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail, None),
            ApiError::InvalidState(detail) => (StatusCode::CONFLICT, "INVALID_STATE", detail, None),
            ApiError::Persistence(detail) => {
                tracing::warn!(%detail, "Pantry store error");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "PERSISTENCE",
                    PERSISTENCE_MESSAGE.to_string(),
                    None,
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(%detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}

fn failure_details(failures: &[ItemFailure]) -> serde_json::Value {
    serde_json::Value::Array(
        failures
            .iter()
            .map(|f| {
                json!({
                    "index": f.index,
                    "draftId": f.draft_id,
                    "name": f.name,
                    "issues": f.error.issues.iter().map(IssueDetail::from).collect::<Vec<_>>(),
                })
            })
            .collect(),
    )
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::FileAccess(detail) => ApiError::FileAccess(detail),
            ExtractionError::UnsupportedMedia(detail) => ApiError::UnsupportedMedia(detail),
            ExtractionError::Format(_) => ApiError::ExtractionFormat(err.to_string()),
            ExtractionError::Parse(_) => ApiError::ExtractionParse(err.to_string()),
            other => ApiError::ExtractionUnavailable(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OwnerNotFound(owner_id) => ApiError::OwnerNotFound(owner_id),
            StoreError::NotFound(id) => ApiError::NotFound(format!("Pantry item {id}")),
            StoreError::LockPoisoned => ApiError::Internal(err.to_string()),
            StoreError::Database(e) => ApiError::Persistence(e.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation {
            message: err.to_string(),
            details: json!({
                "issues": err.issues.iter().map(IssueDetail::from).collect::<Vec<_>>(),
            }),
        }
    }
}

impl From<CommitError> for ApiError {
    fn from(err: CommitError) -> Self {
        let message = err.to_string();
        match err {
            CommitError::EmptyBatch => ApiError::BadRequest(message),
            CommitError::IncompleteBatch { incomplete } => ApiError::IncompleteBatch {
                message,
                details: json!({ "incomplete": incomplete }),
            },
            CommitError::Validation { failures } => ApiError::Validation {
                message,
                details: json!({ "failures": failure_details(&failures) }),
            },
            CommitError::OwnerNotFound(owner_id) => ApiError::OwnerNotFound(owner_id),
            CommitError::Persistence(detail) => ApiError::Persistence(detail),
        }
    }
}

impl From<BufferError> for ApiError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::DraftNotFound(id) => ApiError::NotFound(format!("Draft {id}")),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidTransition { .. } | SessionError::NotEditable(_) => {
                ApiError::InvalidState(err.to_string())
            }
            SessionError::Buffer(e) => e.into(),
            SessionError::Commit(e) => e.into(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Store(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}
