//! The in-process backend and the real server must agree.
//!
//! One scenario runs against both `InMemoryApi` and `HttpApi` (backed by a
//! live `carechat-server`) and records what each call observed. Ids and
//! timestamps differ between runs, so only outcomes are recorded.

use std::sync::Arc;

use carechat::api::http::HttpApi;
use carechat::api::memory::{InMemoryApi, InMemoryBackend};
use carechat::api::{ApiError, ChatApi};
use carechat_proto::conversation::ConversationId;
use carechat_proto::participant::{ParticipantId, ParticipantRef, Role};
use carechat_server::config::ParticipantSeed;
use carechat_server::server::{AppState, start_server_with_state};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// (id, role, name, label, token)
const PEOPLE: [(&str, Role, &str, &str, &str); 3] = [
    ("p-1", Role::Patient, "Pat Doe", "HID-1", "tok-p1"),
    ("d-1", Role::Doctor, "Dr. Lee", "Cardiology", "tok-d1"),
    ("d-2", Role::Doctor, "Dr. Kim", "Oncology", "tok-d2"),
];

fn pid(id: &str) -> ParticipantId {
    ParticipantId::new(id)
}

fn outcome<T>(result: &Result<T, ApiError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(ApiError::Unauthenticated) => "unauthenticated",
        Err(ApiError::Validation(_)) => "validation",
        Err(ApiError::NotFound(_)) => "not-found",
        Err(ApiError::Forbidden(_)) => "forbidden",
        Err(ApiError::Internal(_)) => "internal",
        Err(ApiError::Network(_)) => "network",
        Err(ApiError::Decode(_)) => "decode",
    }
}

fn in_memory() -> (InMemoryApi, InMemoryApi, InMemoryApi) {
    let backend = InMemoryBackend::new();
    let mut sessions = PEOPLE.iter().map(|(id, role, name, label, _)| {
        let who = ParticipantRef::new(*role, pid(id));
        backend.add_participant(&who, *name, Some((*label).to_string()));
        InMemoryApi::new(Arc::clone(&backend), who)
    });
    let (Some(p), Some(d), Some(o)) = (sessions.next(), sessions.next(), sessions.next()) else {
        unreachable!("three participants are defined");
    };
    (p, d, o)
}

async fn over_http() -> (HttpApi, HttpApi, HttpApi) {
    let state = Arc::new(AppState::new());
    let seeds: Vec<ParticipantSeed> = PEOPLE
        .iter()
        .map(|(id, role, name, label, token)| ParticipantSeed {
            id: pid(id),
            role: *role,
            name: (*name).to_string(),
            avatar: None,
            label: Some((*label).to_string()),
            token: Some((*token).to_string()),
        })
        .collect();
    state.seed(&seeds).await;
    let (addr, _handle) = start_server_with_state("127.0.0.1:0", state)
        .await
        .expect("failed to start server");
    let base = format!("http://{addr}");
    (
        HttpApi::new(&base, "tok-p1").unwrap(),
        HttpApi::new(&base, "tok-d1").unwrap(),
        HttpApi::new(&base, "tok-d2").unwrap(),
    )
}

/// Drives every operation through its success and failure paths.
async fn scenario<A: ChatApi>(patient: &A, doctor: &A, outsider: &A) -> Vec<String> {
    let mut seen = Vec::new();

    let c1 = patient.get_or_create_conversation(&pid("d-1")).await.unwrap();
    let reversed = doctor.get_or_create_conversation(&pid("p-1")).await.unwrap();
    seen.push(format!("same conversation both ways: {}", c1 == reversed));
    seen.push(format!(
        "open with self: {}",
        outcome(&patient.get_or_create_conversation(&pid("p-1")).await)
    ));
    seen.push(format!(
        "open with unknown: {}",
        outcome(&patient.get_or_create_conversation(&pid("nobody")).await)
    ));

    seen.push(format!(
        "empty body: {}",
        outcome(&patient.send_message(&c1, &pid("d-1"), "   ").await)
    ));
    seen.push(format!(
        "wrong receiver: {}",
        outcome(&patient.send_message(&c1, &pid("d-2"), "Hi").await)
    ));
    seen.push(format!(
        "outsider send: {}",
        outcome(&outsider.send_message(&c1, &pid("p-1"), "Hi").await)
    ));
    seen.push(format!("outsider read: {}", outcome(&outsider.list_messages(&c1).await)));
    seen.push(format!("outsider mark: {}", outcome(&outsider.mark_seen(&c1).await)));
    seen.push(format!(
        "unknown conversation: {}",
        outcome(&patient.list_messages(&ConversationId::new()).await)
    ));

    let sent = patient.send_message(&c1, &pid("d-1"), "Hello").await.unwrap();
    seen.push(format!("sent status: {:?}", sent.status));

    for row in doctor.list_conversations().await.unwrap() {
        seen.push(format!(
            "doctor row: {} ({:?}) '{}' unread={}",
            row.other_participant.name,
            row.other_participant.label,
            row.last_message,
            row.unread_count
        ));
    }

    let statuses = |log: Vec<carechat_proto::message::Message>| {
        log.iter()
            .map(|m| format!("{}={:?}", m.body, m.status))
            .collect::<Vec<_>>()
            .join(",")
    };
    seen.push(format!("patient reads: {}", statuses(patient.list_messages(&c1).await.unwrap())));
    seen.push(format!("doctor reads: {}", statuses(doctor.list_messages(&c1).await.unwrap())));
    seen.push(format!("patient rereads: {}", statuses(patient.list_messages(&c1).await.unwrap())));

    doctor.send_message(&c1, &pid("p-1"), "Reply").await.unwrap();
    seen.push(format!("doctor mark: {}", doctor.mark_seen(&c1).await.unwrap()));
    seen.push(format!("patient mark: {}", patient.mark_seen(&c1).await.unwrap()));
    seen.push(format!("patient mark again: {}", patient.mark_seen(&c1).await.unwrap()));
    seen.push(format!(
        "outsider rows: {}",
        outsider.list_conversations().await.unwrap().len()
    ));

    seen
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn in_memory_backend_matches_server() {
    let (p, d, o) = in_memory();
    let local = scenario(&p, &d, &o).await;

    let (p, d, o) = over_http().await;
    let remote = scenario(&p, &d, &o).await;

    assert_eq!(local, remote);
    // Spot-check that the scenario exercised what it claims.
    assert!(remote.contains(&"wrong receiver: forbidden".to_string()));
    assert!(remote.contains(&"doctor reads: Hello=Seen".to_string()));
    assert!(remote.contains(&"patient mark: 1".to_string()));
}
