//! Service error taxonomy and its HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use carechat_proto::error::{ErrorBody, ErrorKind};
use carechat_proto::message::ValidationError;

use crate::store::StoreError;

/// Errors returned by every messaging operation.
///
/// None of these are retried server-side; they are returned to the caller
/// as a typed failure with a human-readable message.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No valid session on the request.
    #[error("authentication required")]
    Unauthenticated,

    /// Missing or empty body, malformed identifiers.
    #[error("{0}")]
    Validation(String),

    /// Conversation or participant does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Caller or target is not a participant of the conversation.
    #[error("{0}")]
    Forbidden(String),

    /// The store is unavailable or failed unexpectedly.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the wire-level kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConversationNotFound(_) => Self::NotFound(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        if matches!(kind, ErrorKind::Internal) {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, kind = ?kind, "request rejected");
        }
        let status =
            StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: kind,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
