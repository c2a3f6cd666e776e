//! Read-receipt reconciliation.
//!
//! Without a persistent connection the only receiver-driven transition is
//! `Seen`, triggered by the receiver observing the conversation. The
//! [`Reconciler`] runs as a side effect of the receiver's fetch and is also
//! callable on its own.

use carechat_proto::conversation::ConversationId;
use carechat_proto::participant::ParticipantId;

use crate::error::ApiError;
use crate::registry::require_member;
use crate::store::DocumentStore;

/// Marks messages as seen on behalf of their receiver.
pub struct Reconciler<'a> {
    store: &'a DocumentStore,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler over the given store.
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Moves every message addressed to `reader` in the conversation to
    /// `Seen` and returns how many changed.
    ///
    /// Idempotent: a second call in a row returns 0 and writes nothing.
    /// Messages authored by `reader` are never modified.
    ///
    /// # Errors
    ///
    /// - [`ApiError::NotFound`] if the conversation does not exist.
    /// - [`ApiError::Forbidden`] if `reader` is not a member.
    pub async fn mark_seen(
        &self,
        conversation_id: &ConversationId,
        reader: &ParticipantId,
    ) -> Result<usize, ApiError> {
        require_member(self.store, conversation_id, reader).await?;
        let updated = self.store.mark_seen(conversation_id, reader).await?;
        if updated > 0 {
            tracing::debug!(
                conversation_id = %conversation_id,
                reader = %reader,
                updated,
                "messages marked seen"
            );
        }
        Ok(updated)
    }
}
