//! Syzygy - Device Authorization Grant user gateway
//!
//! The browser-facing half of the OAuth 2.0 device flow (RFC 8628): the user
//! enters the code shown on a constrained device, the gateway consumes it
//! exactly once, resolves the client's redirect target, and hands off to the
//! interactive authorization endpoint. All modules are exposed for testing.

pub mod cache;
pub mod entities;
pub mod errors;
pub mod handoff;
pub mod resolver;
pub mod settings;
pub mod storage;
pub mod verifier;
pub mod web;
