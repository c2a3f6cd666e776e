//! Message log wire types.
//!
//! A [`Message`] is one immutable unit of text inside a conversation. Its only
//! mutable field is [`MessageStatus`], which moves forward through
//! `Sent -> Delivered -> Seen` and never back.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::ConversationId;
use crate::participant::ParticipantId;

/// Maximum allowed message body size in bytes (64 KB).
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Unique identifier for a message, based on UUID v7 for time-ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new time-ordered message identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `MessageId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Millisecond-precision UTC timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp for the current instant.
    #[must_use]
    pub fn now() -> Self {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Creates a timestamp from milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Delivery/read state of a message.
///
/// Variants are declared in lifecycle order so the derived `Ord` matches the
/// allowed transitions. `Delivered` is reserved: nothing produces it yet, but
/// [`MessageStatus::advance`] keeps it between `Sent` and `Seen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Stored by the server, not yet observed by the receiver.
    Sent,
    /// Reached the receiver's device (reserved).
    Delivered,
    /// Observed by the receiver.
    Seen,
}

impl MessageStatus {
    /// Moves the status forward to `next`.
    ///
    /// Returns `true` if the status changed. A target at or below the
    /// current status is ignored, so a `Seen` message never regresses.
    pub fn advance(&mut self, next: Self) -> bool {
        if next > *self {
            *self = next;
            true
        } else {
            false
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sent => write!(f, "sent"),
            Self::Delivered => write!(f, "delivered"),
            Self::Seen => write!(f, "seen"),
        }
    }
}

/// A stored message as returned by `listMessages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server-issued identifier.
    pub id: MessageId,
    /// Owning conversation.
    pub conversation_id: ConversationId,
    /// Author of the message.
    pub sender_id: ParticipantId,
    /// The other member of the conversation.
    pub receiver_id: ParticipantId,
    /// Message text, never empty.
    pub body: String,
    /// Server time at insertion.
    pub timestamp: Timestamp,
    /// Current delivery/read state.
    pub status: MessageStatus,
}

/// Error returned when a message body fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Message body is empty or whitespace only.
    #[error("message body is empty")]
    Empty,
    /// Message body exceeds the maximum allowed size.
    #[error("message too large ({size} bytes, max {max} bytes)")]
    TooLarge {
        /// Actual size of the body in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },
}

/// Validates a message body for sending.
///
/// # Errors
///
/// Returns [`ValidationError::Empty`] if the body is blank, or
/// [`ValidationError::TooLarge`] if it exceeds [`MAX_MESSAGE_SIZE`].
pub fn validate_body(body: &str) -> Result<(), ValidationError> {
    if body.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    let size = body.len();
    if size > MAX_MESSAGE_SIZE {
        return Err(ValidationError::TooLarge {
            size,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(())
}

/// Body of `POST /api/conversations/{id}/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Intended receiver; must be the other member of the conversation.
    pub receiver_id: ParticipantId,
    /// Message text.
    pub body: String,
}

/// Response to a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    /// Server-issued identifier.
    pub id: MessageId,
    /// Server time at insertion.
    pub timestamp: Timestamp,
    /// Always `sent` for a fresh message.
    pub status: MessageStatus,
}

impl From<&Message> for SendMessageResponse {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            timestamp: message.timestamp,
            status: message.status,
        }
    }
}

/// Response to `POST /api/conversations/{id}/seen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSeenResponse {
    /// Number of messages moved to `seen` by this call.
    pub updated_count: usize,
}
