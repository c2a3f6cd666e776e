//! HTTP surface: shared state, request authentication and route handlers.
//!
//! Every handler is a thin adapter: authenticate the caller, decode the
//! request, delegate to the registry, message log or reconciler, and encode
//! the result. Request decoding failures are reported as validation errors
//! with the same JSON error body as every other failure.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{DefaultBodyLimit, FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum::{Json, Router};
use carechat_proto::conversation::{
    ConversationId, ConversationSummary, GetOrCreateRequest, GetOrCreateResponse,
};
use carechat_proto::message::{MarkSeenResponse, Message, SendMessageRequest, SendMessageResponse};
use carechat_proto::participant::Role;

use crate::config::ParticipantSeed;
use crate::error::ApiError;
use crate::messages::MessageLog;
use crate::profiles::{Profile, ProfileDetails, ProfileDirectory};
use crate::receipts::Reconciler;
use crate::registry::ConversationRegistry;
use crate::sessions::{Principal, SessionDirectory};
use crate::store::DocumentStore;

/// Default maximum accepted request body in bytes.
const DEFAULT_MAX_BODY_SIZE: usize = 128 * 1024;

/// Shared server state: the document store and its two collaborators.
pub struct AppState {
    /// Conversations and messages.
    pub store: Arc<DocumentStore>,
    /// Display identity for both participant pools.
    pub profiles: ProfileDirectory,
    /// Bearer token sessions.
    pub sessions: SessionDirectory,
    max_body_size: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Creates empty state with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(Arc::new(DocumentStore::new()), DEFAULT_MAX_BODY_SIZE)
    }

    /// Creates state around an existing store with a custom body limit.
    #[must_use]
    pub fn with_store(store: Arc<DocumentStore>, max_body_size: usize) -> Self {
        Self {
            store,
            profiles: ProfileDirectory::new(),
            sessions: SessionDirectory::new(),
            max_body_size,
        }
    }

    /// Conversation registry over this state.
    #[must_use]
    pub fn registry(&self) -> ConversationRegistry<'_> {
        ConversationRegistry::new(&self.store, &self.profiles)
    }

    /// Message log over this state.
    #[must_use]
    pub fn log(&self) -> MessageLog<'_> {
        MessageLog::new(&self.store)
    }

    /// Read-receipt reconciler over this state.
    #[must_use]
    pub fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(&self.store)
    }

    /// Registers the given participants and their session tokens.
    pub async fn seed(&self, seeds: &[ParticipantSeed]) {
        for seed in seeds {
            let details = match seed.role {
                Role::Doctor => ProfileDetails::Doctor {
                    specialization: seed.label.clone(),
                },
                Role::Patient => ProfileDetails::Patient {
                    health_id: seed.label.clone(),
                },
            };
            let profile = Profile {
                id: seed.id.clone(),
                name: seed.name.clone(),
                avatar: seed.avatar.clone(),
                details,
            };
            if let Some(token) = &seed.token {
                self.sessions
                    .insert(token.clone(), Principal::new(profile.participant()))
                    .await;
            }
            tracing::debug!(participant = %profile.participant(), "participant seeded");
            self.profiles.insert(profile).await;
        }
        tracing::info!(count = seeds.len(), "participants seeded");
    }
}

impl FromRequestParts<Arc<AppState>> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        state.sessions.authenticate(&parts.headers).await
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn healthz() -> &'static str {
    "ok"
}

async fn list_conversations(
    State(state): State<Arc<AppState>>,
    caller: Principal,
) -> Json<Vec<ConversationSummary>> {
    Json(state.registry().list_for_participant(caller.id()).await)
}

async fn get_or_create_conversation(
    State(state): State<Arc<AppState>>,
    caller: Principal,
    body: Result<Json<GetOrCreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GetOrCreateResponse>), ApiError> {
    let Json(request) = body?;
    let (conversation_id, created) = state
        .registry()
        .get_or_create(&caller.participant, &request.other_id)
        .await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(GetOrCreateResponse { conversation_id })))
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    caller: Principal,
    path: Result<Path<ConversationId>, PathRejection>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let Path(conversation_id) = path?;
    let messages = state
        .log()
        .list_by_conversation(&conversation_id, caller.id())
        .await?;
    Ok(Json(messages))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    caller: Principal,
    path: Result<Path<ConversationId>, PathRejection>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SendMessageResponse>), ApiError> {
    let Path(conversation_id) = path?;
    let Json(request) = body?;
    let message = state
        .log()
        .append(
            &conversation_id,
            caller.id(),
            &request.receiver_id,
            &request.body,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(SendMessageResponse::from(&message))))
}

async fn mark_seen(
    State(state): State<Arc<AppState>>,
    caller: Principal,
    path: Result<Path<ConversationId>, PathRejection>,
) -> Result<Json<MarkSeenResponse>, ApiError> {
    let Path(conversation_id) = path?;
    let updated_count = state
        .reconciler()
        .mark_seen(&conversation_id, caller.id())
        .await?;
    Ok(Json(MarkSeenResponse { updated_count }))
}

/// Builds the axum router for the messaging API.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/api/conversations",
            get(list_conversations).post(get_or_create_conversation),
        )
        .route(
            "/api/conversations/{id}/messages",
            get(list_messages).post(send_message),
        )
        .route("/api/conversations/{id}/seen", post(mark_seen))
        .layer(DefaultBodyLimit::max(state.max_body_size))
        .with_state(state)
}

/// Starts the server on the given address with empty state.
///
/// Returns the bound address and the server task handle.
///
/// # Errors
///
/// Returns an error if the TCP listener fails to bind.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(AppState::new())).await
}

/// Starts the server on the given address with pre-built state.
///
/// # Errors
///
/// Returns an error if the TCP listener fails to bind.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<AppState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "http server error");
        }
    });

    Ok((bound_addr, handle))
}
