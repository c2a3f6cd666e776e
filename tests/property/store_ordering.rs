//! Property tests for message log ordering in the server store.
//!
//! Whatever order messages arrive in, `DocumentStore::messages` returns them
//! by timestamp, and messages sharing a timestamp keep their arrival order.

use carechat_proto::conversation::ConversationId;
use carechat_proto::message::{Message, MessageId, MessageStatus, Timestamp};
use carechat_proto::participant::{ParticipantId, ParticipantRef};
use carechat_server::store::DocumentStore;
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn message(conversation_id: &ConversationId, arrival: usize, ts: u64) -> Message {
    Message {
        id: MessageId::new(),
        conversation_id: conversation_id.clone(),
        sender_id: ParticipantId::new("p"),
        receiver_id: ParticipantId::new("d"),
        body: arrival.to_string(),
        timestamp: Timestamp::from_millis(ts),
        status: MessageStatus::Sent,
    }
}

/// Inserts one message per timestamp, in the given order, and returns the
/// log as `(timestamp, arrival index)` pairs.
fn insert_and_read(stamps: &[u64]) -> Vec<(u64, usize)> {
    runtime().block_on(async {
        let store = DocumentStore::new();
        let (conversation, _) = store
            .find_or_insert_conversation(
                ParticipantRef::Patient(ParticipantId::new("p")),
                ParticipantRef::Doctor(ParticipantId::new("d")),
                Timestamp::from_millis(0),
            )
            .await;
        for (arrival, ts) in stamps.iter().enumerate() {
            store
                .insert_message(message(&conversation.id, arrival, *ts))
                .await
                .unwrap();
        }
        store
            .messages(&conversation.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| (m.timestamp.as_millis(), m.body.parse().unwrap()))
            .collect()
    })
}

proptest! {
    #[test]
    fn log_is_ordered_by_timestamp_then_arrival(
        stamps in prop::collection::vec(0u64..8, 0..64),
    ) {
        let log = insert_and_read(&stamps);
        prop_assert_eq!(log.len(), stamps.len());
        for pair in log.windows(2) {
            prop_assert!(pair[0].0 <= pair[1].0);
            if pair[0].0 == pair[1].0 {
                prop_assert!(pair[0].1 < pair[1].1);
            }
        }
    }

    #[test]
    fn log_keeps_every_message_exactly_once(
        stamps in prop::collection::vec(any::<u64>(), 0..32),
    ) {
        let mut arrivals: Vec<usize> = insert_and_read(&stamps).into_iter().map(|(_, a)| a).collect();
        arrivals.sort_unstable();
        prop_assert_eq!(arrivals, (0..stamps.len()).collect::<Vec<_>>());
    }
}
