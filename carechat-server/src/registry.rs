//! Conversation registry: identity and listing of two-party conversations.
//!
//! A conversation is found or created by its unordered participant pair, so
//! repeated first-contact attempts (from either side) converge on one
//! conversation. Listings are enriched with the other member's profile and
//! ordered by most recent activity.

use carechat_proto::conversation::{Conversation, ConversationId, ConversationSummary};
use carechat_proto::message::Timestamp;
use carechat_proto::participant::{ParticipantId, ParticipantRef};

use crate::error::ApiError;
use crate::profiles::ProfileDirectory;
use crate::store::DocumentStore;

/// Conversation lookup, creation and listing over a [`DocumentStore`].
pub struct ConversationRegistry<'a> {
    store: &'a DocumentStore,
    profiles: &'a ProfileDirectory,
}

impl<'a> ConversationRegistry<'a> {
    /// Creates a registry view over the given store and profile directory.
    #[must_use]
    pub const fn new(store: &'a DocumentStore, profiles: &'a ProfileDirectory) -> Self {
        Self { store, profiles }
    }

    /// Returns the conversation between `actor` and `other_id`, creating it
    /// on first contact.
    ///
    /// An existing conversation is returned unchanged (no timestamp bump).
    /// The boolean is `true` when the conversation was created by this call.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Validation`] if `other_id` is blank or equals the actor.
    /// - [`ApiError::NotFound`] if `other_id` is not a known participant.
    pub async fn get_or_create(
        &self,
        actor: &ParticipantRef,
        other_id: &ParticipantId,
    ) -> Result<(ConversationId, bool), ApiError> {
        if other_id.is_blank() {
            return Err(ApiError::Validation("other participant id is empty".into()));
        }
        if other_id == actor.id() {
            return Err(ApiError::Validation(
                "cannot open a conversation with yourself".into(),
            ));
        }

        let other = self
            .profiles
            .resolve(other_id)
            .await
            .ok_or_else(|| ApiError::NotFound(format!("participant {other_id} not found")))?;

        let (conversation, created) = self
            .store
            .find_or_insert_conversation(actor.clone(), other.participant(), Timestamp::now())
            .await;

        if created {
            tracing::info!(
                conversation_id = %conversation.id,
                actor = %actor,
                other = %other.participant(),
                "conversation created"
            );
        } else {
            tracing::debug!(conversation_id = %conversation.id, "existing conversation reused");
        }

        Ok((conversation.id, created))
    }

    /// Lists the conversations of `participant`, most recently active first.
    ///
    /// Each row carries the other member's display identity. Conversations
    /// whose other member can no longer be resolved are left out.
    pub async fn list_for_participant(&self, participant: &ParticipantId) -> Vec<ConversationSummary> {
        let mut conversations = self.store.conversations_for(participant).await;
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let mut summaries = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let Some(other) = conversation.other_member(participant) else {
                continue;
            };
            let Some(profile) = self.profiles.lookup(other).await else {
                tracing::debug!(
                    conversation_id = %conversation.id,
                    other = %other,
                    "skipping conversation with unresolvable participant"
                );
                continue;
            };
            let unread_count = self.store.unread_count(&conversation.id, participant).await;
            summaries.push(ConversationSummary {
                conversation_id: conversation.id,
                other_participant: profile.to_other_participant(),
                last_message: conversation.last_message,
                last_message_time: conversation.last_message_time,
                updated_at: conversation.updated_at,
                unread_count,
            });
        }
        summaries
    }
}

/// Loads a conversation and checks membership of `caller`.
pub(crate) async fn require_member(
    store: &DocumentStore,
    id: &ConversationId,
    caller: &ParticipantId,
) -> Result<Conversation, ApiError> {
    let conversation = store
        .conversation(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("conversation {id} not found")))?;
    if !conversation.has_member(caller) {
        return Err(ApiError::Forbidden(format!(
            "{caller} is not a participant of conversation {id}"
        )));
    }
    Ok(conversation)
}
