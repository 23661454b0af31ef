//! Error helpers shared across the relay crates.

pub mod error;

pub use error::FromMessage;
