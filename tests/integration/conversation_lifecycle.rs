//! Conversation lifecycle over HTTP: create, find again, send, preview.
//!
//! Each test starts a real `carechat-server` on an ephemeral port and talks
//! to it through [`HttpApi`].

use std::sync::Arc;

use carechat::api::http::HttpApi;
use carechat::api::{ApiError, ChatApi};
use carechat_proto::message::MessageStatus;
use carechat_proto::participant::{ParticipantId, Role};
use carechat_server::config::ParticipantSeed;
use carechat_server::server::{AppState, start_server_with_state};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn seed(id: &str, role: Role, name: &str, label: &str, token: &str) -> ParticipantSeed {
    ParticipantSeed {
        id: ParticipantId::new(id),
        role,
        name: name.to_string(),
        avatar: None,
        label: Some(label.to_string()),
        token: Some(token.to_string()),
    }
}

/// Starts a server with patient `p-1` and doctor `d-1`, returning a client
/// for each.
async fn start() -> (HttpApi, HttpApi) {
    let state = Arc::new(AppState::new());
    state
        .seed(&[
            seed("p-1", Role::Patient, "Pat Doe", "HID-1", "tok-p1"),
            seed("d-1", Role::Doctor, "Dr. Lee", "Cardiology", "tok-d1"),
        ])
        .await;
    let (addr, _handle) = start_server_with_state("127.0.0.1:0", state)
        .await
        .expect("failed to start server");
    let base = format!("http://{addr}");
    (
        HttpApi::new(&base, "tok-p1").unwrap(),
        HttpApi::new(&base, "tok-d1").unwrap(),
    )
}

fn pid(id: &str) -> ParticipantId {
    ParticipantId::new(id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_conversation_starts_empty() {
    let (patient, _doctor) = start().await;

    let c1 = patient.get_or_create_conversation(&pid("d-1")).await.unwrap();

    let rows = patient.list_conversations().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].conversation_id, c1);
    assert!(rows[0].last_message.is_empty());
    assert!(rows[0].last_message_time.is_none());
    assert_eq!(rows[0].other_participant.name, "Dr. Lee");
    assert_eq!(rows[0].other_participant.label.as_deref(), Some("Cardiology"));
}

#[tokio::test]
async fn reversed_lookup_returns_same_conversation() {
    let (patient, doctor) = start().await;

    let c1 = patient.get_or_create_conversation(&pid("d-1")).await.unwrap();
    let again = patient.get_or_create_conversation(&pid("d-1")).await.unwrap();
    let reversed = doctor.get_or_create_conversation(&pid("p-1")).await.unwrap();

    assert_eq!(c1, again);
    assert_eq!(c1, reversed);
    assert_eq!(patient.list_conversations().await.unwrap().len(), 1);
    assert_eq!(doctor.list_conversations().await.unwrap().len(), 1);
}

#[tokio::test]
async fn send_updates_preview() {
    let (patient, doctor) = start().await;
    let c1 = patient.get_or_create_conversation(&pid("d-1")).await.unwrap();

    let sent = patient.send_message(&c1, &pid("d-1"), "Hello").await.unwrap();
    assert_eq!(sent.status, MessageStatus::Sent);

    let rows = doctor.list_conversations().await.unwrap();
    assert_eq!(rows[0].last_message, "Hello");
    assert_eq!(rows[0].last_message_time, Some(sent.timestamp));
    assert_eq!(rows[0].unread_count, 1);
    assert_eq!(rows[0].other_participant.name, "Pat Doe");
}

#[tokio::test]
async fn messages_come_back_in_timestamp_order() {
    let (patient, doctor) = start().await;
    let c1 = patient.get_or_create_conversation(&pid("d-1")).await.unwrap();

    for body in ["one", "two", "three"] {
        patient.send_message(&c1, &pid("d-1"), body).await.unwrap();
    }
    doctor.send_message(&c1, &pid("p-1"), "four").await.unwrap();

    let log = patient.list_messages(&c1).await.unwrap();
    let bodies: Vec<_> = log.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, ["one", "two", "three", "four"]);
    assert!(log.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn unknown_participant_is_not_found() {
    let (patient, _doctor) = start().await;
    let result = patient.get_or_create_conversation(&pid("nobody")).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn empty_body_is_rejected() {
    let (patient, _doctor) = start().await;
    let c1 = patient.get_or_create_conversation(&pid("d-1")).await.unwrap();

    let result = patient.send_message(&c1, &pid("d-1"), "").await;
    assert!(matches!(result, Err(ApiError::Validation(_))));
    assert!(patient.list_messages(&c1).await.unwrap().is_empty());
}
