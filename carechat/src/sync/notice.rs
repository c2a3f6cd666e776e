//! Non-blocking notifications from the sync layer to the UI.
//!
//! Views never block on the UI: notices are pushed with `try_send` and
//! dropped (with a log line) if the consumer falls behind.

use carechat_proto::conversation::ConversationId;
use carechat_proto::message::MessageId;
use tokio::sync::mpsc;

use crate::api::ApiError;

/// What a notice is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The conversation list.
    Conversations,
    /// The message log of one conversation.
    Messages(ConversationId),
}

/// A user-visible event raised by a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A scheduled or manual refresh failed; the next tick retries.
    FetchFailed {
        /// What was being fetched.
        scope: Scope,
        /// The failure.
        error: ApiError,
    },
    /// A send failed. The optimistic entry stays visible until the next
    /// successful refresh.
    SendFailed {
        /// Target conversation.
        conversation_id: ConversationId,
        /// Client-side identifier of the optimistic entry.
        local_id: MessageId,
        /// The failure.
        error: ApiError,
    },
    /// An explicit mark-seen call failed.
    MarkSeenFailed {
        /// Target conversation.
        conversation_id: ConversationId,
        /// The failure.
        error: ApiError,
    },
    /// A refresh brought new content.
    Updated(Scope),
}

/// Sending half of the notice channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Notice>,
}

impl Notifier {
    /// Pushes a notice without waiting.
    pub fn notify(&self, notice: Notice) {
        if let Err(e) = self.tx.try_send(notice) {
            tracing::debug!(error = %e, "notice dropped");
        }
    }
}

/// Creates a notice channel holding up to `buffer` undelivered notices.
#[must_use]
pub fn channel(buffer: usize) -> (Notifier, mpsc::Receiver<Notice>) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (Notifier { tx }, rx)
}
