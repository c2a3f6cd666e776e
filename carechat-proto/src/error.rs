//! Error body returned by the HTTP surface.

use serde::{Deserialize, Serialize};

/// Failure taxonomy shared by the server and the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No valid session.
    Unauthenticated,
    /// Missing or empty body, malformed IDs.
    Validation,
    /// Conversation or participant does not exist.
    NotFound,
    /// Caller or target is not a participant of the conversation.
    Forbidden,
    /// Store unavailable or other server fault.
    Internal,
}

impl ErrorKind {
    /// HTTP status code used for this kind.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::Forbidden => 403,
            Self::Internal => 500,
        }
    }
}

/// JSON error body: `{ "error": <kind>, "message": <text> }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Failure kind.
    pub error: ErrorKind,
    /// Human-readable description.
    pub message: String,
}
