//! Authorization over HTTP: sessions, membership and receiver checks.

use std::sync::Arc;

use carechat::api::http::HttpApi;
use carechat::api::{ApiError, ChatApi};
use carechat_proto::conversation::ConversationId;
use carechat_proto::participant::{ParticipantId, Role};
use carechat_server::config::ParticipantSeed;
use carechat_server::server::{AppState, start_server_with_state};

fn seed(id: &str, role: Role, token: &str) -> ParticipantSeed {
    ParticipantSeed {
        id: ParticipantId::new(id),
        role,
        name: id.to_string(),
        avatar: None,
        label: None,
        token: Some(token.to_string()),
    }
}

/// Patient `p-1`, doctor `d-1` and an unrelated doctor `d-2`.
async fn start() -> (String, HttpApi, HttpApi, HttpApi) {
    let state = Arc::new(AppState::new());
    state
        .seed(&[
            seed("p-1", Role::Patient, "tok-p1"),
            seed("d-1", Role::Doctor, "tok-d1"),
            seed("d-2", Role::Doctor, "tok-d2"),
        ])
        .await;
    let (addr, _handle) = start_server_with_state("127.0.0.1:0", state)
        .await
        .expect("failed to start server");
    let base = format!("http://{addr}");
    (
        base.clone(),
        HttpApi::new(&base, "tok-p1").unwrap(),
        HttpApi::new(&base, "tok-d1").unwrap(),
        HttpApi::new(&base, "tok-d2").unwrap(),
    )
}

#[tokio::test]
async fn send_to_non_member_is_forbidden() {
    let (_base, patient, _doctor, _other) = start().await;
    let c1 = patient
        .get_or_create_conversation(&ParticipantId::new("d-1"))
        .await
        .unwrap();

    let result = patient
        .send_message(&c1, &ParticipantId::new("someOtherId"), "Hi")
        .await;
    assert!(matches!(result, Err(ApiError::Forbidden(_))));

    // A real participant who is not in this conversation is refused too.
    let result = patient
        .send_message(&c1, &ParticipantId::new("d-2"), "Hi")
        .await;
    assert!(matches!(result, Err(ApiError::Forbidden(_))));
    assert!(patient.list_messages(&c1).await.unwrap().is_empty());
}

#[tokio::test]
async fn outsider_cannot_read_or_write() {
    let (_base, patient, _doctor, outsider) = start().await;
    let c1 = patient
        .get_or_create_conversation(&ParticipantId::new("d-1"))
        .await
        .unwrap();
    patient
        .send_message(&c1, &ParticipantId::new("d-1"), "private")
        .await
        .unwrap();

    assert!(matches!(
        outsider.list_messages(&c1).await,
        Err(ApiError::Forbidden(_))
    ));
    assert!(matches!(
        outsider
            .send_message(&c1, &ParticipantId::new("p-1"), "hi")
            .await,
        Err(ApiError::Forbidden(_))
    ));
    assert!(matches!(
        outsider.mark_seen(&c1).await,
        Err(ApiError::Forbidden(_))
    ));
    assert!(outsider.list_conversations().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_conversation_is_not_found() {
    let (_base, patient, _doctor, _other) = start().await;
    let result = patient.list_messages(&ConversationId::new()).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn bad_token_is_unauthenticated() {
    let (base, _patient, _doctor, _other) = start().await;
    let stranger = HttpApi::new(&base, "not-a-token").unwrap();
    assert_eq!(
        stranger.list_conversations().await,
        Err(ApiError::Unauthenticated)
    );
}
