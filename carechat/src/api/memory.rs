//! In-process implementation of [`ChatApi`].
//!
//! [`InMemoryBackend`] holds conversations, messages and participant
//! profiles for any number of callers; each [`InMemoryApi`] is one caller's
//! session against it. The backend follows the server's rules (idempotent
//! conversation identity, membership checks, mark-seen on fetch) so views
//! can be exercised without a network.
//!
//! Two knobs simulate a real network: an offline switch that fails every
//! call with [`ApiError::Network`], and a response latency. The latency is
//! applied after the request has been processed, so a slow response carries
//! the state as it was when the request arrived.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use carechat_proto::conversation::{
    Conversation, ConversationId, ConversationSummary, OtherParticipant,
};
use carechat_proto::message::{
    Message, MessageId, MessageStatus, SendMessageResponse, Timestamp, validate_body,
};
use carechat_proto::participant::{PairKey, ParticipantId, ParticipantRef};
use parking_lot::Mutex;

use super::{ApiError, ChatApi};

#[derive(Default)]
struct BackendState {
    profiles: HashMap<ParticipantId, OtherParticipant>,
    conversations: HashMap<ConversationId, Conversation>,
    by_pair: HashMap<PairKey, ConversationId>,
    messages: HashMap<ConversationId, Vec<Message>>,
}

impl BackendState {
    fn member_conversation(
        &self,
        id: &ConversationId,
        caller: &ParticipantId,
    ) -> Result<&Conversation, ApiError> {
        let conversation = self
            .conversations
            .get(id)
            .ok_or_else(|| ApiError::NotFound(format!("conversation {id} not found")))?;
        if conversation.has_member(caller) {
            Ok(conversation)
        } else {
            Err(ApiError::Forbidden(format!(
                "{caller} is not a participant of conversation {id}"
            )))
        }
    }

    fn mark_seen(&mut self, id: &ConversationId, reader: &ParticipantId) -> usize {
        let Some(log) = self.messages.get_mut(id) else {
            return 0;
        };
        let mut updated = 0;
        for message in log.iter_mut().filter(|m| &m.receiver_id == reader) {
            if message.status.advance(MessageStatus::Seen) {
                updated += 1;
            }
        }
        updated
    }

    fn summaries(&self, me: &ParticipantId) -> Vec<ConversationSummary> {
        let mut rows: Vec<ConversationSummary> = self
            .conversations
            .values()
            .filter(|c| c.has_member(me))
            .filter_map(|c| {
                let other = self.profiles.get(c.other_member(me)?.id())?;
                let unread_count = self.messages.get(&c.id).map_or(0, |log| {
                    log.iter()
                        .filter(|m| &m.receiver_id == me && m.status != MessageStatus::Seen)
                        .count()
                });
                Some(ConversationSummary {
                    conversation_id: c.id.clone(),
                    other_participant: other.clone(),
                    last_message: c.last_message.clone(),
                    last_message_time: c.last_message_time,
                    updated_at: c.updated_at,
                    unread_count,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        rows
    }

    fn get_or_create(
        &mut self,
        caller: &ParticipantRef,
        other_id: &ParticipantId,
    ) -> Result<ConversationId, ApiError> {
        if other_id.is_blank() {
            return Err(ApiError::Validation("other participant id is empty".into()));
        }
        if other_id == caller.id() {
            return Err(ApiError::Validation(
                "cannot open a conversation with yourself".into(),
            ));
        }
        let other = self
            .profiles
            .get(other_id)
            .map(|p| ParticipantRef::new(p.role, p.id.clone()))
            .ok_or_else(|| ApiError::NotFound(format!("participant {other_id} not found")))?;

        let key = PairKey::new(caller.id(), other_id);
        if let Some(id) = self.by_pair.get(&key) {
            return Ok(id.clone());
        }
        let conversation = Conversation::new(caller.clone(), other, Timestamp::now());
        let id = conversation.id.clone();
        self.by_pair.insert(key, id.clone());
        self.conversations.insert(id.clone(), conversation);
        Ok(id)
    }

    fn append(
        &mut self,
        conversation_id: &ConversationId,
        sender_id: &ParticipantId,
        receiver_id: &ParticipantId,
        body: &str,
    ) -> Result<SendMessageResponse, ApiError> {
        validate_body(body).map_err(|e| ApiError::Validation(e.to_string()))?;
        let conversation = self.member_conversation(conversation_id, sender_id)?;
        if conversation.other_member(sender_id).map(ParticipantRef::id) != Some(receiver_id) {
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
        let response = SendMessageResponse::from(&message);
        self.messages
            .entry(conversation_id.clone())
            .or_default()
            .push(message);
        if let Some(c) = self.conversations.get_mut(conversation_id) {
            if c.last_message_time.is_none_or(|t| t <= response.timestamp) {
                c.last_message = body.to_string();
                c.last_message_time = Some(response.timestamp);
                c.updated_at = c.updated_at.max(response.timestamp);
            }
        }
        Ok(response)
    }
}

/// Shared in-memory store behind one or more [`InMemoryApi`] sessions.
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
    offline: AtomicBool,
    latency_ms: AtomicU64,
    calls: AtomicUsize,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a participant's display identity.
    pub fn add_participant(
        &self,
        participant: &ParticipantRef,
        name: impl Into<String>,
        label: Option<String>,
    ) {
        let profile = OtherParticipant {
            id: participant.id().clone(),
            role: participant.role(),
            name: name.into(),
            avatar: None,
            label,
        };
        self.state
            .lock()
            .profiles
            .insert(participant.id().clone(), profile);
    }

    /// Switches the backend between reachable and unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delays every response by `latency` (measured on the tokio clock).
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Total number of calls received, including failed ones.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns a copy of a conversation's stored messages, bypassing
    /// membership checks and read reconciliation.
    #[must_use]
    pub fn stored_messages(&self, id: &ConversationId) -> Vec<Message> {
        self.state.lock().messages.get(id).cloned().unwrap_or_default()
    }

    /// Runs one request against the state, then waits out the latency.
    async fn call<T>(
        &self,
        handler: impl FnOnce(&mut BackendState) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = if self.offline.load(Ordering::SeqCst) {
            Err(ApiError::Network("server unreachable".into()))
        } else {
            handler(&mut self.state.lock())
        };
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        result
    }
}

/// One caller's session against an [`InMemoryBackend`].
#[derive(Clone)]
pub struct InMemoryApi {
    backend: Arc<InMemoryBackend>,
    caller: ParticipantRef,
}

impl InMemoryApi {
    /// Creates a session for `caller`.
    #[must_use]
    pub const fn new(backend: Arc<InMemoryBackend>, caller: ParticipantRef) -> Self {
        Self { backend, caller }
    }
}

impl ChatApi for InMemoryApi {
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ApiError> {
        let me = self.caller.id();
        self.backend.call(|state| Ok(state.summaries(me))).await
    }

    async fn get_or_create_conversation(
        &self,
        other_id: &ParticipantId,
    ) -> Result<ConversationId, ApiError> {
        self.backend
            .call(|state| state.get_or_create(&self.caller, other_id))
            .await
    }

    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, ApiError> {
        let me = self.caller.id();
        self.backend
            .call(|state| {
                state.member_conversation(conversation_id, me)?;
                state.mark_seen(conversation_id, me);
                let mut log = state
                    .messages
                    .get(conversation_id)
                    .cloned()
                    .unwrap_or_default();
                log.sort_by_key(|m| m.timestamp);
                Ok(log)
            })
            .await
    }

    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        receiver_id: &ParticipantId,
        body: &str,
    ) -> Result<SendMessageResponse, ApiError> {
        let me = self.caller.id();
        self.backend
            .call(|state| state.append(conversation_id, me, receiver_id, body))
            .await
    }

    async fn mark_seen(&self, conversation_id: &ConversationId) -> Result<usize, ApiError> {
        let me = self.caller.id();
        self.backend
            .call(|state| {
                state.member_conversation(conversation_id, me)?;
                Ok(state.mark_seen(conversation_id, me))
            })
            .await
    }
}
