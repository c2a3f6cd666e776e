//! Live view of one conversation's messages.
//!
//! A [`ConversationView`] is mounted on a conversation and polls its message
//! log while the client is visible. Fetching the log as the receiver is what
//! drives read receipts on the server, so an open view keeps the other
//! side's messages marked `seen`.
//!
//! # Optimistic send
//!
//! [`ConversationView::send`] appends a locally synthesized message before
//! the request is issued. The entry is never rolled back: a failed send is
//! reported as [`Notice::SendFailed`] and the entry stays (marked
//! [`Delivery::Failed`]) until the next successful refresh replaces the view
//! with the server's log. Delivery is therefore "shown at least once", not
//! "guaranteed delivered".
//!
//! # Reconciliation
//!
//! Each refresh replaces the displayed log with the server's, except for
//! local entries the server copy could not reflect yet:
//! - sends still in flight;
//! - sends confirmed after the refresh was issued and missing from it.
//!
//! A refresh that completes after a newer one has been applied is discarded.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use carechat_proto::conversation::ConversationId;
use carechat_proto::message::{Message, MessageId, MessageStatus, Timestamp, validate_body};
use carechat_proto::participant::ParticipantId;
use parking_lot::Mutex;

use super::FetchGate;
use super::notice::{Notice, Notifier, Scope};
use super::poller::Poller;
use super::visibility::VisibilitySource;
use crate::api::{ApiError, ChatApi};

/// The conversation a view is mounted on, from the caller's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTarget {
    /// Conversation to display.
    pub conversation_id: ConversationId,
    /// The local participant.
    pub me: ParticipantId,
    /// The other member; every send is addressed to them.
    pub other: ParticipantId,
}

/// How a displayed entry relates to the server's log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Part of the last applied server log.
    Synced,
    /// Optimistic entry whose send has not completed.
    Pending,
    /// Accepted by the server but not yet seen in a fetched log.
    Accepted,
    /// The send failed; shown until the next refresh.
    Failed,
}

/// One row of the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewEntry {
    /// The message as displayed. For optimistic entries the id and timestamp
    /// are client-generated until the server confirms them.
    pub message: Message,
    /// Relation to the server's log.
    pub delivery: Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    InFlight,
    Accepted { confirmed_at: u64 },
    Failed,
}

#[derive(Debug)]
struct LocalEntry {
    local_id: MessageId,
    message: Message,
    phase: Phase,
}

#[derive(Debug, Default)]
struct ViewState {
    server: Vec<Message>,
    locals: Vec<LocalEntry>,
    gate: FetchGate,
}

impl ViewState {
    fn entries(&self) -> Vec<ViewEntry> {
        let synced = self.server.iter().map(|m| ViewEntry {
            message: m.clone(),
            delivery: Delivery::Synced,
        });
        let local = self.locals.iter().map(|l| ViewEntry {
            message: l.message.clone(),
            delivery: match l.phase {
                Phase::InFlight => Delivery::Pending,
                Phase::Accepted { .. } => Delivery::Accepted,
                Phase::Failed => Delivery::Failed,
            },
        });
        synced.chain(local).collect()
    }

    /// Applies a fetched log. Returns `None` if the result is stale, or
    /// whether the displayed content changed.
    fn apply(&mut self, ticket: u64, messages: Vec<Message>) -> Option<bool> {
        if !self.gate.admit(ticket) {
            return None;
        }
        let before = self.locals.len();
        {
            let fetched: HashSet<&MessageId> = messages.iter().map(|m| &m.id).collect();
            self.locals.retain(|local| match local.phase {
                Phase::InFlight => true,
                Phase::Accepted { confirmed_at } => {
                    ticket <= confirmed_at && !fetched.contains(&local.message.id)
                }
                Phase::Failed => false,
            });
        }
        let changed = self.locals.len() != before || self.server != messages;
        self.server = messages;
        Some(changed)
    }

    fn confirm(
        &mut self,
        local_id: &MessageId,
        id: MessageId,
        timestamp: Timestamp,
        status: MessageStatus,
    ) {
        let already_fetched = self.server.iter().any(|m| m.id == id);
        if already_fetched {
            self.locals.retain(|l| &l.local_id != local_id);
            return;
        }
        let confirmed_at = self.gate.issued();
        if let Some(local) = self.locals.iter_mut().find(|l| &l.local_id == local_id) {
            local.message.id = id;
            local.message.timestamp = timestamp;
            local.message.status = status;
            local.phase = Phase::Accepted { confirmed_at };
        }
    }

    fn fail(&mut self, local_id: &MessageId) {
        if let Some(local) = self.locals.iter_mut().find(|l| &l.local_id == local_id) {
            local.phase = Phase::Failed;
        }
    }
}

struct Shared<A> {
    api: Arc<A>,
    target: ConversationTarget,
    state: Mutex<ViewState>,
    notifier: Notifier,
}

impl<A: ChatApi> Shared<A> {
    fn scope(&self) -> Scope {
        Scope::Messages(self.target.conversation_id.clone())
    }

    async fn refresh(&self) -> Result<bool, ApiError> {
        let conversation_id = &self.target.conversation_id;
        let ticket = self.state.lock().gate.begin();

        let messages = match self.api.list_messages(conversation_id).await {
            Ok(messages) => messages,
            Err(error) => {
                tracing::warn!(conversation_id = %conversation_id, error = %error, "message fetch failed");
                self.notifier.notify(Notice::FetchFailed {
                    scope: self.scope(),
                    error: error.clone(),
                });
                return Err(error);
            }
        };

        let count = messages.len();
        let applied = self.state.lock().apply(ticket, messages);
        match applied {
            None => {
                tracing::debug!(conversation_id = %conversation_id, ticket, "stale message fetch discarded");
                Ok(false)
            }
            Some(changed) => {
                tracing::trace!(conversation_id = %conversation_id, count, changed, "messages refreshed");
                if changed {
                    self.notifier.notify(Notice::Updated(self.scope()));
                }
                Ok(changed)
            }
        }
    }
}

/// A mounted conversation. Polling stops when this is dropped.
pub struct ConversationView<A: ChatApi + 'static> {
    shared: Arc<Shared<A>>,
    _poller: Poller,
}

impl<A: ChatApi + 'static> ConversationView<A> {
    /// Mounts a view and starts polling every `interval` while visible.
    ///
    /// If the client is visible the first fetch is issued immediately.
    /// Must be called from within a tokio runtime.
    pub fn mount(
        api: Arc<A>,
        target: ConversationTarget,
        interval: Duration,
        visibility: &VisibilitySource,
        notifier: Notifier,
    ) -> Self {
        tracing::info!(conversation_id = %target.conversation_id, "conversation view mounted");
        let shared = Arc::new(Shared {
            api,
            target,
            state: Mutex::new(ViewState::default()),
            notifier,
        });

        let poll_shared = Arc::clone(&shared);
        let poller = Poller::spawn("messages", interval, visibility.subscribe(), move || {
            let shared = Arc::clone(&poll_shared);
            async move {
                // Failures are already reported as notices.
                let _ = shared.refresh().await;
            }
        });

        Self {
            shared,
            _poller: poller,
        }
    }

    /// The conversation this view is mounted on.
    #[must_use]
    pub fn target(&self) -> &ConversationTarget {
        &self.shared.target
    }

    /// Current rows: the server log followed by local entries in send order.
    #[must_use]
    pub fn entries(&self) -> Vec<ViewEntry> {
        self.shared.state.lock().entries()
    }

    /// Fetches the log now, outside the poll schedule.
    ///
    /// Returns whether the displayed content changed. A result that arrives
    /// after a newer one has been applied is discarded and reported as
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns the fetch error after raising [`Notice::FetchFailed`].
    pub async fn refresh(&self) -> Result<bool, ApiError> {
        self.shared.refresh().await
    }

    /// Sends `body` to the other member with an optimistic local entry.
    ///
    /// The entry is visible in [`entries`](Self::entries) before the request
    /// is issued. Returns the server-issued message id.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Validation`] if the body is empty or too large; no
    ///   entry is added in that case.
    /// - Any send failure, after raising [`Notice::SendFailed`]. The entry
    ///   is kept and marked [`Delivery::Failed`].
    pub async fn send(&self, body: &str) -> Result<MessageId, ApiError> {
        validate_body(body).map_err(|e| ApiError::Validation(e.to_string()))?;
        let shared = &self.shared;
        let target = &shared.target;

        let local = Message {
            id: MessageId::new(),
            conversation_id: target.conversation_id.clone(),
            sender_id: target.me.clone(),
            receiver_id: target.other.clone(),
            body: body.to_string(),
            timestamp: Timestamp::now(),
            status: MessageStatus::Sent,
        };
        let local_id = local.id.clone();
        shared.state.lock().locals.push(LocalEntry {
            local_id: local_id.clone(),
            message: local,
            phase: Phase::InFlight,
        });
        shared.notifier.notify(Notice::Updated(shared.scope()));

        match shared
            .api
            .send_message(&target.conversation_id, &target.other, body)
            .await
        {
            Ok(response) => {
                tracing::debug!(
                    conversation_id = %target.conversation_id,
                    local_id = %local_id,
                    message_id = %response.id,
                    "send confirmed"
                );
                let id = response.id.clone();
                shared
                    .state
                    .lock()
                    .confirm(&local_id, response.id, response.timestamp, response.status);
                Ok(id)
            }
            Err(error) => {
                tracing::warn!(
                    conversation_id = %target.conversation_id,
                    local_id = %local_id,
                    error = %error,
                    "send failed"
                );
                shared.state.lock().fail(&local_id);
                shared.notifier.notify(Notice::SendFailed {
                    conversation_id: target.conversation_id.clone(),
                    local_id,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Marks the other member's messages as seen without fetching.
    ///
    /// # Errors
    ///
    /// Returns the call error after raising [`Notice::MarkSeenFailed`].
    pub async fn mark_seen(&self) -> Result<usize, ApiError> {
        let conversation_id = &self.shared.target.conversation_id;
        match self.shared.api.mark_seen(conversation_id).await {
            Ok(updated) => Ok(updated),
            Err(error) => {
                tracing::warn!(conversation_id = %conversation_id, error = %error, "mark seen failed");
                self.shared.notifier.notify(Notice::MarkSeenFailed {
                    conversation_id: conversation_id.clone(),
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }
}

impl<A: ChatApi + 'static> Drop for ConversationView<A> {
    fn drop(&mut self) {
        tracing::info!(conversation_id = %self.shared.target.conversation_id, "conversation view unmounted");
    }
}
