//! In-memory document store for conversations and messages.
//!
//! The [`DocumentStore`] holds three collections behind one [`RwLock`]:
//! conversations by ID, a pair index enforcing one conversation per
//! unordered participant pair, and a per-conversation message log kept
//! sorted by timestamp (ties keep insertion order).
//!
//! Every method takes the lock once. Appending a message and refreshing the
//! conversation preview are deliberately two separate calls, so a reader can
//! observe the message before the preview catches up.

use std::collections::HashMap;

use carechat_proto::conversation::{Conversation, ConversationId};
use carechat_proto::message::{Message, MessageStatus, Timestamp};
use carechat_proto::participant::{PairKey, ParticipantId, ParticipantRef};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The referenced conversation does not exist.
    #[error("conversation {0} not found")]
    ConversationNotFound(ConversationId),
}

/// Whole-store image used for persistence.
///
/// The pair index is derived data and is rebuilt on [`DocumentStore::restore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Every conversation document.
    pub conversations: Vec<Conversation>,
    /// Every message, in per-conversation log order.
    pub messages: Vec<Message>,
}

#[derive(Default)]
struct Collections {
    conversations: HashMap<ConversationId, Conversation>,
    by_pair: HashMap<PairKey, ConversationId>,
    messages: HashMap<ConversationId, Vec<Message>>,
}

/// Conversation and message collections.
///
/// Thread-safe via [`RwLock`].
pub struct DocumentStore {
    inner: RwLock<Collections>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Collections::default()),
        }
    }

    /// Returns the conversation for the pair `{a, b}`, creating it if absent.
    ///
    /// Lookup and insert happen under one write lock, so concurrent first
    /// contact from both sides converges on a single conversation. The
    /// boolean is `true` when a new conversation was created.
    pub async fn find_or_insert_conversation(
        &self,
        a: ParticipantRef,
        b: ParticipantRef,
        now: Timestamp,
    ) -> (Conversation, bool) {
        let key = PairKey::new(a.id(), b.id());
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner
            .by_pair
            .get(&key)
            .and_then(|id| inner.conversations.get(id))
        {
            return (existing.clone(), false);
        }

        let conversation = Conversation::new(a, b, now);
        let id = conversation.id.clone();
        inner.by_pair.insert(key, id.clone());
        inner.messages.insert(id.clone(), Vec::new());
        inner.conversations.insert(id, conversation.clone());
        drop(inner);

        (conversation, true)
    }

    /// Returns a conversation by ID.
    pub async fn conversation(&self, id: &ConversationId) -> Option<Conversation> {
        self.inner.read().await.conversations.get(id).cloned()
    }

    /// Returns every conversation that has `participant` as a member.
    pub async fn conversations_for(&self, participant: &ParticipantId) -> Vec<Conversation> {
        let inner = self.inner.read().await;
        inner
            .conversations
            .values()
            .filter(|c| c.has_member(participant))
            .cloned()
            .collect()
    }

    /// Appends a message to its conversation's log.
    ///
    /// The message is placed after every message with a timestamp less than
    /// or equal to its own, keeping the log sorted with insertion order as
    /// the tie-breaker.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConversationNotFound`] if the owning
    /// conversation does not exist.
    pub async fn insert_message(&self, message: Message) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let log = inner
            .messages
            .get_mut(&message.conversation_id)
            .ok_or_else(|| StoreError::ConversationNotFound(message.conversation_id.clone()))?;
        let pos = log.partition_point(|m| m.timestamp <= message.timestamp);
        log.insert(pos, message);
        drop(inner);
        Ok(())
    }

    /// Refreshes the denormalized preview of a conversation.
    ///
    /// The preview only moves forward in time: a `time` older than the
    /// current `last_message_time` is ignored. Returns `true` if the preview
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConversationNotFound`] if the conversation does
    /// not exist.
    pub async fn update_preview(
        &self,
        id: &ConversationId,
        body: &str,
        time: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let conversation = inner
            .conversations
            .get_mut(id)
            .ok_or_else(|| StoreError::ConversationNotFound(id.clone()))?;

        if conversation.last_message_time.is_some_and(|t| time < t) {
            return Ok(false);
        }
        conversation.last_message = body.to_string();
        conversation.last_message_time = Some(time);
        conversation.updated_at = conversation.updated_at.max(time);
        drop(inner);
        Ok(true)
    }

    /// Returns the messages of a conversation in log order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConversationNotFound`] if the conversation does
    /// not exist.
    pub async fn messages(&self, id: &ConversationId) -> Result<Vec<Message>, StoreError> {
        let inner = self.inner.read().await;
        inner
            .messages
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::ConversationNotFound(id.clone()))
    }

    /// Moves every message addressed to `reader` to `Seen`.
    ///
    /// Messages authored by `reader` are never touched. Returns the number
    /// of messages whose status changed; a repeated call returns 0.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConversationNotFound`] if the conversation does
    /// not exist.
    pub async fn mark_seen(
        &self,
        id: &ConversationId,
        reader: &ParticipantId,
    ) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().await;
        let log = inner
            .messages
            .get_mut(id)
            .ok_or_else(|| StoreError::ConversationNotFound(id.clone()))?;
        let mut updated = 0;
        for m in log
            .iter_mut()
            .filter(|m| m.receiver_id == *reader && m.sender_id != *reader)
        {
            if m.status.advance(MessageStatus::Seen) {
                updated += 1;
            }
        }
        drop(inner);
        Ok(updated)
    }

    /// Counts messages addressed to `reader` that are not yet `Seen`.
    pub async fn unread_count(&self, id: &ConversationId, reader: &ParticipantId) -> usize {
        let inner = self.inner.read().await;
        inner.messages.get(id).map_or(0, |log| {
            log.iter()
                .filter(|m| m.receiver_id == *reader && m.status < MessageStatus::Seen)
                .count()
        })
    }

    /// Copies the whole store into a [`Snapshot`].
    pub async fn snapshot(&self) -> Snapshot {
        let inner = self.inner.read().await;
        Snapshot {
            conversations: inner.conversations.values().cloned().collect(),
            messages: inner.messages.values().flatten().cloned().collect(),
        }
    }

    /// Replaces the store contents with a [`Snapshot`].
    ///
    /// Messages whose conversation is missing from the snapshot are dropped.
    /// If the snapshot holds two conversations for the same pair, the first
    /// one keeps the pair index.
    pub async fn restore(&self, snapshot: Snapshot) {
        let mut fresh = Collections::default();
        for conversation in snapshot.conversations {
            let id = conversation.id.clone();
            fresh
                .by_pair
                .entry(conversation.pair_key())
                .or_insert_with(|| id.clone());
            fresh.messages.insert(id.clone(), Vec::new());
            fresh.conversations.insert(id, conversation);
        }

        let mut dropped = 0usize;
        for message in snapshot.messages {
            if let Some(log) = fresh.messages.get_mut(&message.conversation_id) {
                let pos = log.partition_point(|m| m.timestamp <= message.timestamp);
                log.insert(pos, message);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::warn!(dropped, "snapshot held messages for unknown conversations");
        }

        *self.inner.write().await = fresh;
    }
}
