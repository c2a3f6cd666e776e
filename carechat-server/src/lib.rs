//! `CareChat` messaging server library.
//!
//! Exposes the conversation registry, message log and read-receipt
//! reconciler, together with the HTTP surface that serves them, for use in
//! tests and embedding.

pub mod config;
pub mod error;
pub mod messages;
pub mod profiles;
pub mod receipts;
pub mod registry;
pub mod server;
pub mod sessions;
pub mod snapshot;
pub mod store;
