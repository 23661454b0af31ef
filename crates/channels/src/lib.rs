//! Platform-neutral outbound model.
//!
//! A channel (LINE today) answers an inbound event by spending a
//! [`ReplyHandle`] on one or more [`Segment`]s through its [`ReplyApi`].

pub mod error;
pub mod handle;
pub mod outbound;
pub mod segment;

pub use {
    error::{DeliveryError, Result},
    handle::ReplyHandle,
    outbound::ReplyApi,
    segment::Segment,
};
