//! Visibility-gated polling against a live server.
//!
//! Uses real time with short intervals; assertions wait with a deadline
//! rather than sleeping a fixed amount.

use std::sync::Arc;
use std::time::Duration;

use carechat::api::ChatApi;
use carechat::api::http::HttpApi;
use carechat::sync::conversation_list::ConversationListView;
use carechat::sync::conversation_view::{ConversationTarget, ConversationView, Delivery};
use carechat::sync::notice::{self, Notice, Scope};
use carechat::sync::visibility::{Visibility, VisibilitySource};
use carechat_proto::conversation::ConversationId;
use carechat_proto::message::MessageStatus;
use carechat_proto::participant::{ParticipantId, Role};
use carechat_server::config::ParticipantSeed;
use carechat_server::server::{AppState, start_server_with_state};

const INTERVAL: Duration = Duration::from_millis(100);
const DEADLINE: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

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

async fn start() -> (Arc<HttpApi>, Arc<HttpApi>, ConversationId) {
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
    let patient = Arc::new(HttpApi::new(&base, "tok-p1").unwrap());
    let doctor = Arc::new(HttpApi::new(&base, "tok-d1").unwrap());
    let c1 = patient
        .get_or_create_conversation(&ParticipantId::new("d-1"))
        .await
        .unwrap();
    (patient, doctor, c1)
}

fn patient_target(conversation_id: &ConversationId) -> ConversationTarget {
    ConversationTarget {
        conversation_id: conversation_id.clone(),
        me: ParticipantId::new("p-1"),
        other: ParticipantId::new("d-1"),
    }
}

/// Polls `check` until it returns true or the deadline passes.
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < DEADLINE {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn visible_view_picks_up_incoming_message() {
    let (patient, doctor, c1) = start().await;
    let source = VisibilitySource::default();
    let (notifier, mut notices) = notice::channel(64);
    let view = ConversationView::mount(patient, patient_target(&c1), INTERVAL, &source, notifier);

    doctor
        .send_message(&c1, &ParticipantId::new("p-1"), "Your results are ready")
        .await
        .unwrap();

    assert!(eventually(|| view.entries().iter().any(|e| e.message.body == "Your results are ready")).await);

    // The view's fetch reconciled the message for the patient.
    let log = doctor.list_messages(&c1).await.unwrap();
    assert_eq!(log[0].status, MessageStatus::Seen);

    let mut updated = false;
    while let Ok(n) = notices.try_recv() {
        updated |= n == Notice::Updated(Scope::Messages(c1.clone()));
    }
    assert!(updated);
}

#[tokio::test]
async fn hidden_view_does_not_fetch_until_shown() {
    let (patient, doctor, c1) = start().await;
    let source = VisibilitySource::new(Visibility::Hidden);
    let (notifier, _notices) = notice::channel(64);
    let view = ConversationView::mount(patient, patient_target(&c1), INTERVAL, &source, notifier);

    doctor
        .send_message(&c1, &ParticipantId::new("p-1"), "ping")
        .await
        .unwrap();
    tokio::time::sleep(INTERVAL * 5).await;

    // No fetch happened, so nothing was reconciled.
    assert!(view.entries().is_empty());
    assert_eq!(
        doctor.list_messages(&c1).await.unwrap()[0].status,
        MessageStatus::Sent
    );

    source.set(Visibility::Visible);
    assert!(eventually(|| view.entries().len() == 1).await);
    assert_eq!(
        doctor.list_messages(&c1).await.unwrap()[0].status,
        MessageStatus::Seen
    );
}

#[tokio::test]
async fn optimistic_send_settles_into_synced_entry() {
    let (patient, doctor, c1) = start().await;
    let source = VisibilitySource::default();
    let (notifier, _notices) = notice::channel(64);
    let view = ConversationView::mount(patient, patient_target(&c1), INTERVAL, &source, notifier);

    let id = view.send("Hello").await.unwrap();
    assert!(
        eventually(|| view
            .entries()
            .iter()
            .any(|e| e.message.id == id && e.delivery == Delivery::Synced))
        .await
    );
    assert_eq!(view.entries().len(), 1);

    let log = doctor.list_messages(&c1).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].id, id);
}

#[tokio::test]
async fn sender_view_sees_seen_status_after_receiver_reads() {
    let (patient, doctor, c1) = start().await;
    let source = VisibilitySource::default();
    let (notifier, _notices) = notice::channel(64);
    let view = ConversationView::mount(patient, patient_target(&c1), INTERVAL, &source, notifier);

    let id = view.send("Hello").await.unwrap();
    doctor.list_messages(&c1).await.unwrap();

    assert!(
        eventually(|| view
            .entries()
            .iter()
            .any(|e| e.message.id == id && e.message.status == MessageStatus::Seen))
        .await
    );
}

#[tokio::test]
async fn list_view_tracks_unread_count() {
    let (patient, doctor, c1) = start().await;
    let source = VisibilitySource::default();
    let (notifier, _notices) = notice::channel(64);
    let list = ConversationListView::mount(Arc::clone(&doctor), INTERVAL, &source, notifier);

    assert!(eventually(|| list.rows().len() == 1).await);
    assert_eq!(list.total_unread(), 0);

    patient
        .send_message(&c1, &ParticipantId::new("d-1"), "question")
        .await
        .unwrap();
    assert!(eventually(|| list.total_unread() == 1).await);
    assert_eq!(list.rows()[0].last_message, "question");

    doctor.list_messages(&c1).await.unwrap();
    assert!(eventually(|| list.total_unread() == 0).await);
}

#[tokio::test]
async fn dropped_view_stops_reconciling() {
    let (patient, doctor, c1) = start().await;
    let source = VisibilitySource::default();
    let (notifier, _notices) = notice::channel(64);
    let view = ConversationView::mount(patient, patient_target(&c1), INTERVAL, &source, notifier);
    drop(view);

    doctor
        .send_message(&c1, &ParticipantId::new("p-1"), "anyone there?")
        .await
        .unwrap();
    tokio::time::sleep(INTERVAL * 5).await;

    assert_eq!(
        doctor.list_messages(&c1).await.unwrap()[0].status,
        MessageStatus::Sent
    );
}
