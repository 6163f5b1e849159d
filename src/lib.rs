//! Thumbcache - video thumbnail lookups behind a write-behind cache
//!
//! This library crate exposes the service components for the binary and for
//! integration testing.

pub mod config;
pub mod context;
pub mod orchestrator;
pub mod remote;
pub mod server;
pub mod writeback;
