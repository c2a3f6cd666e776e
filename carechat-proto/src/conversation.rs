//! Conversation wire types.
//!
//! A conversation is a durable channel between exactly two participants. Its
//! `last_message` / `last_message_time` fields are a denormalized preview of
//! the most recent message and are advisory only.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Timestamp;
use crate::participant::{PairKey, ParticipantId, ParticipantRef, Role};

/// Identifies a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(Uuid);

impl ConversationId {
    /// Creates a new conversation identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `ConversationId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A conversation document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique identifier assigned at creation.
    pub id: ConversationId,
    /// The two members, in creation order. Order carries no meaning.
    pub participants: [ParticipantRef; 2],
    /// Body of the most recent message, empty until the first send.
    pub last_message: String,
    /// Timestamp of the most recent message.
    pub last_message_time: Option<Timestamp>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last time a message was appended (or creation time).
    pub updated_at: Timestamp,
}

impl Conversation {
    /// Creates an empty conversation between `a` and `b`.
    #[must_use]
    pub fn new(a: ParticipantRef, b: ParticipantRef, now: Timestamp) -> Self {
        Self {
            id: ConversationId::new(),
            participants: [a, b],
            last_message: String::new(),
            last_message_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the uniqueness key of this conversation's participant pair.
    #[must_use]
    pub fn pair_key(&self) -> PairKey {
        PairKey::new(self.participants[0].id(), self.participants[1].id())
    }

    /// Returns `true` if `id` is one of the two members.
    #[must_use]
    pub fn has_member(&self, id: &ParticipantId) -> bool {
        self.participants.iter().any(|p| p.id() == id)
    }

    /// Returns the member that is not `id`, or `None` if `id` is not a member.
    #[must_use]
    pub fn other_member(&self, id: &ParticipantId) -> Option<&ParticipantRef> {
        match &self.participants {
            [a, b] if a.id() == id => Some(b),
            [a, b] if b.id() == id => Some(a),
            _ => None,
        }
    }
}

/// Display identity of the other member, as resolved by the profile service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherParticipant {
    /// Participant identifier.
    pub id: ParticipantId,
    /// Identity pool.
    pub role: Role,
    /// Display name.
    pub name: String,
    /// Avatar reference, if any.
    pub avatar: Option<String>,
    /// Specialization for doctors, health identifier for patients.
    pub label: Option<String>,
}

/// One row of `listConversations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Conversation identifier.
    pub conversation_id: ConversationId,
    /// The member that is not the caller.
    pub other_participant: OtherParticipant,
    /// Preview text.
    pub last_message: String,
    /// Preview time.
    pub last_message_time: Option<Timestamp>,
    /// Last activity; the list is ordered by this, newest first.
    pub updated_at: Timestamp,
    /// Messages addressed to the caller that are not yet `seen`.
    #[serde(default)]
    pub unread_count: usize,
}

/// Body of `POST /api/conversations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOrCreateRequest {
    /// The participant to talk to.
    pub other_id: ParticipantId,
}

/// Response to `POST /api/conversations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOrCreateResponse {
    /// Existing or newly created conversation.
    pub conversation_id: ConversationId,
}
