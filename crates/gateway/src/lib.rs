//! HTTP gateway: receives LINE webhooks and routes each event to a reply.
//!
//! `POST /webhook` verifies the signature over the raw body, parses the
//! batch and hands it to the [`WebhookRouter`](router::WebhookRouter).
//! `GET /health` reports liveness.

pub mod commands;
pub mod languages;
pub mod router;
pub mod server;
pub mod state;
pub mod webhook;

pub use {
    router::{EventOutcome, SkipReason, WebhookRouter},
    server::{build_app, start_server},
    state::GatewayState,
};
