//! Per-user conversation state.
//!
//! Each LINE user gets a session on first contact that remembers which mode
//! the conversation is in. Sessions idle past the configured TTL are dropped
//! and the user starts over in chat mode.

pub mod store;

pub use store::{SessionMode, SessionStore};
