//! Shared wire types for the `CareChat` messaging core.

pub mod conversation;
pub mod error;
pub mod message;
pub mod participant;
