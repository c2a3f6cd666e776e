//! HTTP implementation of [`ChatApi`] using reqwest.
//!
//! Requests carry the session as `Authorization: Bearer <token>`. Calls have
//! no overall timeout: a slow response simply delays the caller's next poll.

use std::time::Duration;

use carechat_proto::conversation::{
    ConversationId, ConversationSummary, GetOrCreateRequest, GetOrCreateResponse,
};
use carechat_proto::error::ErrorBody;
use carechat_proto::message::{
    MarkSeenResponse, Message, SendMessageRequest, SendMessageResponse,
};
use carechat_proto::participant::ParticipantId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::{ApiError, ChatApi};

/// Time allowed to establish a TCP connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`ChatApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base: Url,
    token: String,
    http: reqwest::Client,
}

impl HttpApi {
    /// Creates a client for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] if `base_url` is not an absolute
    /// `http`/`https` URL, or [`ApiError::Network`] if the HTTP client cannot
    /// be built.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, ApiError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| ApiError::Validation(format!("invalid base url {base_url}: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ApiError::Validation(format!(
                "unsupported url scheme: {}",
                base.scheme()
            )));
        }
        // Url::join replaces the last segment unless the path ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            base,
            token: token.into(),
            http,
        })
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Validation(format!("invalid endpoint {path}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        tracing::trace!(%url, "GET");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(network)?;
        decode_response(response).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        tracing::trace!(%url, "POST");
        let mut request = self.http.post(url).bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(network)?;
        decode_response(response).await
    }
}

fn network(err: reqwest::Error) -> ApiError {
    ApiError::Network(err.to_string())
}

async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(network)?;
    if !status.is_success() {
        let body = serde_json::from_slice::<ErrorBody>(&bytes).ok();
        let err = ApiError::from_response(status.as_u16(), body);
        tracing::debug!(status = status.as_u16(), error = %err, "request rejected");
        return Err(err);
    }
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

impl ChatApi for HttpApi {
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ApiError> {
        self.get_json("api/conversations").await
    }

    async fn get_or_create_conversation(
        &self,
        other_id: &ParticipantId,
    ) -> Result<ConversationId, ApiError> {
        let request = GetOrCreateRequest {
            other_id: other_id.clone(),
        };
        let response: GetOrCreateResponse =
            self.post_json("api/conversations", Some(&request)).await?;
        Ok(response.conversation_id)
    }

    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, ApiError> {
        self.get_json(&format!("api/conversations/{conversation_id}/messages"))
            .await
    }

    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        receiver_id: &ParticipantId,
        body: &str,
    ) -> Result<SendMessageResponse, ApiError> {
        let request = SendMessageRequest {
            receiver_id: receiver_id.clone(),
            body: body.to_string(),
        };
        self.post_json(
            &format!("api/conversations/{conversation_id}/messages"),
            Some(&request),
        )
        .await
    }

    async fn mark_seen(&self, conversation_id: &ConversationId) -> Result<usize, ApiError> {
        let response: MarkSeenResponse = self
            .post_json::<(), _>(&format!("api/conversations/{conversation_id}/seen"), None)
            .await?;
        Ok(response.updated_count)
    }
}
