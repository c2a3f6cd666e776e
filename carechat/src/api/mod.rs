//! Client transport for the messaging API.
//!
//! Defines the [`ChatApi`] trait that every transport implementation must
//! satisfy. Concrete implementations:
//! - [`http::HttpApi`]: JSON over HTTP against `carechat-server`
//! - [`memory::InMemoryApi`]: in-process backend for tests and offline demos

pub mod http;
pub mod memory;

use std::future::Future;

use carechat_proto::conversation::{ConversationId, ConversationSummary};
use carechat_proto::error::{ErrorBody, ErrorKind};
use carechat_proto::message::{Message, SendMessageResponse};
use carechat_proto::participant::ParticipantId;

/// Errors surfaced by a [`ChatApi`] call.
///
/// The first five variants mirror the server taxonomy; `Network` and
/// `Decode` are transport-level failures that never reach the server or
/// come back unreadable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No valid session.
    #[error("not signed in")]
    Unauthenticated,

    /// The request was rejected as malformed.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The conversation or participant does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller may not perform this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The server failed.
    #[error("server error: {0}")]
    Internal(String),

    /// The server could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Rebuilds a typed error from a non-success HTTP status and its body.
    ///
    /// Falls back to the status code when the body is not a valid
    /// [`ErrorBody`].
    #[must_use]
    pub fn from_response(status: u16, body: Option<ErrorBody>) -> Self {
        let (kind, message) = match body {
            Some(body) => (body.error, body.message),
            None => (kind_for_status(status), format!("HTTP {status}")),
        };
        match kind {
            ErrorKind::Unauthenticated => Self::Unauthenticated,
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Forbidden => Self::Forbidden(message),
            ErrorKind::Internal => Self::Internal(message),
        }
    }
}

const fn kind_for_status(status: u16) -> ErrorKind {
    match status {
        401 => ErrorKind::Unauthenticated,
        400 | 413 | 422 => ErrorKind::Validation,
        403 => ErrorKind::Forbidden,
        404 => ErrorKind::NotFound,
        _ => ErrorKind::Internal,
    }
}

/// The five messaging operations, on behalf of one authenticated caller.
///
/// Every call is a single request/response; implementations hold no
/// per-conversation state. Futures are `Send` so calls can run inside
/// spawned poll tasks.
pub trait ChatApi: Send + Sync {
    /// Lists the caller's conversations, most recently active first.
    fn list_conversations(
        &self,
    ) -> impl Future<Output = Result<Vec<ConversationSummary>, ApiError>> + Send;

    /// Returns the conversation with `other_id`, creating it on first contact.
    fn get_or_create_conversation(
        &self,
        other_id: &ParticipantId,
    ) -> impl Future<Output = Result<ConversationId, ApiError>> + Send;

    /// Lists a conversation's messages in timestamp order.
    ///
    /// As a side effect, messages addressed to the caller become `seen`.
    fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> impl Future<Output = Result<Vec<Message>, ApiError>> + Send;

    /// Sends a message to the other member of a conversation.
    fn send_message(
        &self,
        conversation_id: &ConversationId,
        receiver_id: &ParticipantId,
        body: &str,
    ) -> impl Future<Output = Result<SendMessageResponse, ApiError>> + Send;

    /// Marks every message addressed to the caller as `seen`.
    fn mark_seen(
        &self,
        conversation_id: &ConversationId,
    ) -> impl Future<Output = Result<usize, ApiError>> + Send;
}
