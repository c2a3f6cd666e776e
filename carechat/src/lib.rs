//! `CareChat` client library: transport, polling sync protocol and
//! configuration.

pub mod api;
pub mod config;
pub mod render;
pub mod sync;
