//! Polling synchronization protocol.
//!
//! Without a push channel, client views stay approximately live by polling
//! the server while the client is visible:
//! - [`conversation_view::ConversationView`] polls one conversation's
//!   messages and owns the optimistic-send path.
//! - [`conversation_list::ConversationListView`] polls the conversation
//!   list on a longer interval.
//!
//! Both are scoped resources: their poll loops stop when they are dropped.

pub mod conversation_list;
pub mod conversation_view;
pub mod notice;
pub mod poller;
pub mod visibility;

use std::time::Duration;

/// Polling cadence and notification buffering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Interval between message fetches for an open conversation.
    pub message_interval: Duration,
    /// Interval between conversation list fetches.
    pub list_interval: Duration,
    /// Capacity of the notice channel.
    pub notice_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            message_interval: Duration::from_secs(3),
            list_interval: Duration::from_secs(10),
            notice_buffer: 64,
        }
    }
}

/// Orders concurrent fetches so that an older response never overwrites a
/// newer one.
///
/// Each fetch takes a ticket before it is issued; its result is applied only
/// if no later ticket has been applied already.
#[derive(Debug, Default)]
pub(crate) struct FetchGate {
    issued: u64,
    applied: u64,
}

impl FetchGate {
    /// Takes a ticket for a fetch about to be issued.
    pub(crate) const fn begin(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Returns `true` and records the ticket if its result is still fresh.
    pub(crate) const fn admit(&mut self, ticket: u64) -> bool {
        if ticket <= self.applied {
            return false;
        }
        self.applied = ticket;
        true
    }

    /// The most recently issued ticket.
    pub(crate) const fn issued(&self) -> u64 {
        self.issued
    }
}
