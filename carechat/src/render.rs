//! Plain-text rendering of views for the line-oriented CLI.

use carechat_proto::conversation::ConversationSummary;
use carechat_proto::message::{MessageStatus, Timestamp};
use carechat_proto::participant::ParticipantId;

use crate::sync::conversation_view::{Delivery, ViewEntry};

/// Formats a timestamp in local time with a chrono format string.
///
/// Falls back to the raw millisecond value if it is out of range.
#[must_use]
pub fn format_time(timestamp: Timestamp, format: &str) -> String {
    i64::try_from(timestamp.as_millis())
        .ok()
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map_or_else(
            || timestamp.as_millis().to_string(),
            |utc| utc.with_timezone(&chrono::Local).format(format).to_string(),
        )
}

/// Status marker shown after an outgoing message.
const fn status_marker(entry: &ViewEntry) -> &'static str {
    match entry.delivery {
        Delivery::Pending => "…",
        Delivery::Failed => "!",
        Delivery::Accepted | Delivery::Synced => match entry.message.status {
            MessageStatus::Sent => "✓",
            MessageStatus::Delivered => "✓✓",
            MessageStatus::Seen => "seen",
        },
    }
}

/// One line for a message, e.g. `[14:02] you: Hello (seen)`.
#[must_use]
pub fn format_entry(entry: &ViewEntry, me: &ParticipantId, other_name: &str, format: &str) -> String {
    let time = format_time(entry.message.timestamp, format);
    if &entry.message.sender_id == me {
        format!(
            "[{time}] you: {} ({})",
            entry.message.body,
            status_marker(entry)
        )
    } else {
        format!("[{time}] {other_name}: {}", entry.message.body)
    }
}

/// One line for a conversation list row.
#[must_use]
pub fn format_summary(row: &ConversationSummary, format: &str) -> String {
    let who = &row.other_participant;
    let label = who
        .label
        .as_deref()
        .map(|l| format!(" ({l})"))
        .unwrap_or_default();
    let unread = if row.unread_count > 0 {
        format!(" [{} unread]", row.unread_count)
    } else {
        String::new()
    };
    let preview = if row.last_message.is_empty() {
        "no messages yet".to_string()
    } else {
        let when = row
            .last_message_time
            .map(|t| format_time(t, format))
            .unwrap_or_default();
        format!("{when} {}", row.last_message)
    };
    format!("{} [{}]{label}{unread}: {preview}", who.name, who.id)
}
