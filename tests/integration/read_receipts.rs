//! Read reconciliation over HTTP: fetching a log marks incoming messages
//! as seen, and the sender observes the change.

use std::sync::Arc;

use carechat::api::ChatApi;
use carechat::api::http::HttpApi;
use carechat_proto::message::MessageStatus;
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

async fn start() -> (HttpApi, HttpApi) {
    let state = Arc::new(AppState::new());
    state
        .seed(&[
            seed("p-1", Role::Patient, "tok-p1"),
            seed("d-1", Role::Doctor, "tok-d1"),
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

#[tokio::test]
async fn receiver_fetch_marks_seen_for_sender() {
    let (patient, doctor) = start().await;
    let c1 = patient
        .get_or_create_conversation(&ParticipantId::new("d-1"))
        .await
        .unwrap();
    let sent = patient
        .send_message(&c1, &ParticipantId::new("d-1"), "Hello")
        .await
        .unwrap();

    // Sender's own fetch does not touch outgoing messages.
    let before = patient.list_messages(&c1).await.unwrap();
    assert_eq!(before[0].status, MessageStatus::Sent);

    let received = doctor.list_messages(&c1).await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].id, sent.id);
    assert_eq!(received[0].status, MessageStatus::Seen);

    let after = patient.list_messages(&c1).await.unwrap();
    assert_eq!(after[0].status, MessageStatus::Seen);
}

#[tokio::test]
async fn reconciliation_only_touches_incoming() {
    let (patient, doctor) = start().await;
    let c1 = patient
        .get_or_create_conversation(&ParticipantId::new("d-1"))
        .await
        .unwrap();
    patient
        .send_message(&c1, &ParticipantId::new("d-1"), "from patient")
        .await
        .unwrap();
    doctor
        .send_message(&c1, &ParticipantId::new("p-1"), "from doctor")
        .await
        .unwrap();

    let seen_by_doctor = doctor.list_messages(&c1).await.unwrap();
    let status_of = |log: &[carechat_proto::message::Message], body: &str| {
        log.iter()
            .find(|m| m.body == body)
            .map(|m| m.status)
            .unwrap()
    };
    assert_eq!(status_of(&seen_by_doctor, "from patient"), MessageStatus::Seen);
    assert_eq!(status_of(&seen_by_doctor, "from doctor"), MessageStatus::Sent);
}

#[tokio::test]
async fn explicit_mark_seen_is_idempotent() {
    let (patient, doctor) = start().await;
    let c1 = patient
        .get_or_create_conversation(&ParticipantId::new("d-1"))
        .await
        .unwrap();
    for body in ["a", "b"] {
        patient
            .send_message(&c1, &ParticipantId::new("d-1"), body)
            .await
            .unwrap();
    }

    assert_eq!(doctor.mark_seen(&c1).await.unwrap(), 2);
    assert_eq!(doctor.mark_seen(&c1).await.unwrap(), 0);
    assert_eq!(doctor.list_conversations().await.unwrap()[0].unread_count, 0);
}
