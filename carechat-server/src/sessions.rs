//! Session lookup: bearer token to authenticated principal.
//!
//! Session issuance belongs to the wider portal. The messaging core only
//! needs to turn a request into `(participant, role)` or reject it.

use std::collections::HashMap;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use carechat_proto::participant::{ParticipantId, ParticipantRef, Role};
use tokio::sync::RwLock;

use crate::error::ApiError;

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Role-tagged participant reference.
    pub participant: ParticipantRef,
}

impl Principal {
    /// Creates a principal for the given participant.
    #[must_use]
    pub const fn new(participant: ParticipantRef) -> Self {
        Self { participant }
    }

    /// Returns the caller's participant identifier.
    #[must_use]
    pub const fn id(&self) -> &ParticipantId {
        self.participant.id()
    }

    /// Returns the caller's identity pool.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.participant.role()
    }
}

/// In-memory token directory.
///
/// Thread-safe via [`RwLock`].
pub struct SessionDirectory {
    tokens: RwLock<HashMap<String, Principal>>,
}

impl Default for SessionDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Associates a bearer token with a principal, replacing any previous one.
    pub async fn insert(&self, token: impl Into<String>, principal: Principal) {
        self.tokens.write().await.insert(token.into(), principal);
    }

    /// Returns the principal for a token, if any.
    pub async fn resolve(&self, token: &str) -> Option<Principal> {
        self.tokens.read().await.get(token).cloned()
    }

    /// Authenticates a request from its `Authorization: Bearer` header.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] if the header is missing,
    /// malformed, or names an unknown token.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, ApiError> {
        let token = bearer_token(headers).ok_or(ApiError::Unauthenticated)?;
        self.resolve(token).await.ok_or(ApiError::Unauthenticated)
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}
