//! LINE Messaging API channel.
//!
//! Long replies are split by the [`Segmenter`], packed by the
//! [`Aggregator`] and paced out by a [`DispatchQueue`] that owns the
//! event's reply token. [`LineClient`] is the HTTP side of that pipeline;
//! [`event`] and [`signature`] cover the inbound webhook.

pub mod aggregate;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod segment;
pub mod signature;

pub use {
    aggregate::Aggregator,
    client::LineClient,
    dispatch::{
        DeliveryRecord, DeliveryVia, DispatchConfig, DispatchQueue, DropReason, Outcome,
        QueueState,
    },
    error::{Error, Result},
    event::{Event, EventKind, WebhookPayload},
    segment::{Boundary, Segmenter},
};
