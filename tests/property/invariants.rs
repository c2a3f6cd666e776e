//! Property tests for the protocol invariants.
//!
//! 1. Pair keys are symmetric: `{a, b}` and `{b, a}` collide, distinct pairs don't.
//! 2. Status transitions never regress, whatever order updates arrive in.
//! 3. Wire types survive a JSON round-trip.
//!
//! Log ordering is checked against the server store in `store_ordering.rs`.

use carechat_proto::conversation::{Conversation, ConversationId};
use carechat_proto::message::{Message, MessageId, MessageStatus, Timestamp};
use carechat_proto::participant::{PairKey, ParticipantId, ParticipantRef};
use proptest::prelude::*;
use uuid::Uuid;

fn arb_participant_id() -> impl Strategy<Value = ParticipantId> {
    "[a-z0-9-]{1,16}".prop_map(ParticipantId::new)
}

fn arb_status() -> impl Strategy<Value = MessageStatus> {
    prop_oneof![
        Just(MessageStatus::Sent),
        Just(MessageStatus::Delivered),
        Just(MessageStatus::Seen),
    ]
}

fn arb_message() -> impl Strategy<Value = Message> {
    (
        any::<u128>(),
        any::<u128>(),
        arb_participant_id(),
        arb_participant_id(),
        "[^\x00]{1,256}",
        any::<u64>(),
        arb_status(),
    )
        .prop_map(|(id, conv, sender, receiver, body, ts, status)| Message {
            id: MessageId::from_uuid(Uuid::from_u128(id)),
            conversation_id: ConversationId::from_uuid(Uuid::from_u128(conv)),
            sender_id: sender,
            receiver_id: receiver,
            body,
            timestamp: Timestamp::from_millis(ts),
            status,
        })
}

proptest! {
    #[test]
    fn pair_key_is_symmetric(a in arb_participant_id(), b in arb_participant_id()) {
        prop_assert_eq!(PairKey::new(&a, &b), PairKey::new(&b, &a));
    }

    #[test]
    fn pair_key_distinguishes_different_pairs(
        a in arb_participant_id(),
        b in arb_participant_id(),
        c in arb_participant_id(),
    ) {
        prop_assume!(c != a && c != b);
        prop_assert_ne!(PairKey::new(&a, &b), PairKey::new(&a, &c));
    }

    #[test]
    fn conversation_pair_key_ignores_creation_order(
        a in arb_participant_id(),
        b in arb_participant_id(),
    ) {
        let now = Timestamp::from_millis(0);
        let forward = Conversation::new(
            ParticipantRef::Patient(a.clone()),
            ParticipantRef::Doctor(b.clone()),
            now,
        );
        let reverse = Conversation::new(ParticipantRef::Doctor(b), ParticipantRef::Patient(a), now);
        prop_assert_eq!(forward.pair_key(), reverse.pair_key());
    }

    #[test]
    fn status_never_regresses(updates in prop::collection::vec(arb_status(), 0..32)) {
        let mut status = MessageStatus::Sent;
        let mut high_water = status;
        for next in updates {
            status.advance(next);
            prop_assert!(status >= high_water);
            high_water = status;
        }
    }

    #[test]
    fn seen_is_terminal(updates in prop::collection::vec(arb_status(), 0..32)) {
        let mut status = MessageStatus::Seen;
        for next in updates {
            prop_assert!(!status.advance(next));
        }
        prop_assert_eq!(status, MessageStatus::Seen);
    }

    #[test]
    fn message_json_round_trip(message in arb_message()) {
        let json = serde_json::to_string(&message).unwrap();
        let decoded: Message = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(decoded, message);
    }
}
