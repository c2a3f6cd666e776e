//! Live view of the caller's conversation list.
//!
//! Polls `list_conversations` on its own, longer interval under the same
//! visibility gating as the message view. The two schedules are independent.

use std::sync::Arc;
use std::time::Duration;

use carechat_proto::conversation::{ConversationId, ConversationSummary};
use carechat_proto::participant::ParticipantId;
use parking_lot::Mutex;

use super::FetchGate;
use super::notice::{Notice, Notifier, Scope};
use super::poller::Poller;
use super::visibility::VisibilitySource;
use crate::api::{ApiError, ChatApi};

#[derive(Debug, Default)]
struct ListState {
    rows: Vec<ConversationSummary>,
    gate: FetchGate,
}

struct Shared<A> {
    api: Arc<A>,
    state: Mutex<ListState>,
    notifier: Notifier,
}

impl<A: ChatApi> Shared<A> {
    async fn refresh(&self) -> Result<bool, ApiError> {
        let ticket = self.state.lock().gate.begin();
        let rows = match self.api.list_conversations().await {
            Ok(rows) => rows,
            Err(error) => {
                tracing::warn!(error = %error, "conversation list fetch failed");
                self.notifier.notify(Notice::FetchFailed {
                    scope: Scope::Conversations,
                    error: error.clone(),
                });
                return Err(error);
            }
        };

        let changed = {
            let mut state = self.state.lock();
            if !state.gate.admit(ticket) {
                tracing::debug!(ticket, "stale conversation list discarded");
                return Ok(false);
            }
            let changed = state.rows != rows;
            state.rows = rows;
            changed
        };
        if changed {
            self.notifier.notify(Notice::Updated(Scope::Conversations));
        }
        Ok(changed)
    }
}

/// A mounted conversation list. Polling stops when this is dropped.
pub struct ConversationListView<A: ChatApi + 'static> {
    shared: Arc<Shared<A>>,
    _poller: Poller,
}

impl<A: ChatApi + 'static> ConversationListView<A> {
    /// Mounts the list and starts polling every `interval` while visible.
    pub fn mount(
        api: Arc<A>,
        interval: Duration,
        visibility: &VisibilitySource,
        notifier: Notifier,
    ) -> Self {
        let shared = Arc::new(Shared {
            api,
            state: Mutex::new(ListState::default()),
            notifier,
        });
        let poll_shared = Arc::clone(&shared);
        let poller = Poller::spawn("conversations", interval, visibility.subscribe(), move || {
            let shared = Arc::clone(&poll_shared);
            async move {
                let _ = shared.refresh().await;
            }
        });
        Self {
            shared,
            _poller: poller,
        }
    }

    /// Rows from the last applied fetch, most recently active first.
    #[must_use]
    pub fn rows(&self) -> Vec<ConversationSummary> {
        self.shared.state.lock().rows.clone()
    }

    /// Sum of unread counts across all rows.
    #[must_use]
    pub fn total_unread(&self) -> usize {
        self.shared.state.lock().rows.iter().map(|r| r.unread_count).sum()
    }

    /// Fetches the list now, outside the poll schedule.
    ///
    /// # Errors
    ///
    /// Returns the fetch error after raising [`Notice::FetchFailed`].
    pub async fn refresh(&self) -> Result<bool, ApiError> {
        self.shared.refresh().await
    }

    /// Opens (or starts) the conversation with `other_id` and refreshes the
    /// list so the row appears without waiting for the next tick.
    ///
    /// # Errors
    ///
    /// Returns the lookup error; a failed follow-up refresh is only reported
    /// as a notice.
    pub async fn open(&self, other_id: &ParticipantId) -> Result<ConversationId, ApiError> {
        let conversation_id = self.shared.api.get_or_create_conversation(other_id).await?;
        tracing::info!(conversation_id = %conversation_id, other = %other_id, "conversation opened");
        let _ = self.shared.refresh().await;
        Ok(conversation_id)
    }
}
