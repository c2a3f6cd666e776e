//! Message log: append and ordered retrieval per conversation.
//!
//! Appending inserts the message and then refreshes the conversation
//! preview as a second, independent write. If the second write fails the
//! message is still stored and listed; only the advisory preview lags.

use carechat_proto::conversation::ConversationId;
use carechat_proto::message::{Message, MessageId, MessageStatus, Timestamp, validate_body};
use carechat_proto::participant::ParticipantId;

use crate::error::ApiError;
use crate::receipts::Reconciler;
use crate::registry::require_member;
use crate::store::DocumentStore;

/// Append-only message log over a [`DocumentStore`].
pub struct MessageLog<'a> {
    store: &'a DocumentStore,
}

impl<'a> MessageLog<'a> {
    /// Creates a message log view over the given store.
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Appends a message from `sender_id` to `receiver_id`.
    ///
    /// The new message has status `Sent` and the current server time. After
    /// it is stored, the conversation's `last_message`, `last_message_time`
    /// and `updated_at` are refreshed.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Validation`] if the body is empty or too large, or the
    ///   receiver id is blank.
    /// - [`ApiError::NotFound`] if the conversation does not exist.
    /// - [`ApiError::Forbidden`] if the sender is not a member, or the
    ///   receiver is not the other member.
    pub async fn append(
        &self,
        conversation_id: &ConversationId,
        sender_id: &ParticipantId,
        receiver_id: &ParticipantId,
        body: &str,
    ) -> Result<Message, ApiError> {
        validate_body(body)?;
        if receiver_id.is_blank() {
            return Err(ApiError::Validation("receiver id is empty".into()));
        }

        let conversation = require_member(self.store, conversation_id, sender_id).await?;
        let expected = conversation
            .other_member(sender_id)
            .map(|other| other.id().clone());
        if expected.as_ref() != Some(receiver_id) {
            tracing::warn!(
                conversation_id = %conversation_id,
                sender = %sender_id,
                receiver = %receiver_id,
                "send to non-participant rejected"
            );
            return Err(ApiError::Forbidden(format!(
                "{receiver_id} is not the other participant of conversation {conversation_id}"
            )));
        }

        let message = Message {
            id: MessageId::new(),
            conversation_id: conversation_id.clone(),
            sender_id: sender_id.clone(),
            receiver_id: receiver_id.clone(),
            body: body.to_string(),
            timestamp: Timestamp::now(),
            status: MessageStatus::Sent,
        };
        self.store.insert_message(message.clone()).await?;

        // Preview refresh is advisory; the message is already durable.
        match self
            .store
            .update_preview(conversation_id, &message.body, message.timestamp)
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::debug!(
                conversation_id = %conversation_id,
                "preview already holds a newer message"
            ),
            Err(e) => tracing::warn!(
                conversation_id = %conversation_id,
                error = %e,
                "message stored but preview update failed"
            ),
        }

        tracing::info!(
            conversation_id = %conversation_id,
            message_id = %message.id,
            sender = %sender_id,
            body_len = message.body.len(),
            "message appended"
        );
        Ok(message)
    }

    /// Returns the conversation's messages ordered by timestamp, ties by
    /// insertion order.
    ///
    /// Runs the [`Reconciler`] for `caller` first, so messages addressed to
    /// the caller are returned (and stored) as `Seen`.
    ///
    /// # Errors
    ///
    /// - [`ApiError::NotFound`] if the conversation does not exist.
    /// - [`ApiError::Forbidden`] if `caller` is not a member.
    pub async fn list_by_conversation(
        &self,
        conversation_id: &ConversationId,
        caller: &ParticipantId,
    ) -> Result<Vec<Message>, ApiError> {
        Reconciler::new(self.store)
            .mark_seen(conversation_id, caller)
            .await?;
        Ok(self.store.messages(conversation_id).await?)
    }
}
