use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// `x-line-signature` missing or not matching the body.
    #[error("invalid webhook signature")]
    Signature,

    /// Body is not a well-formed webhook payload.
    #[error("malformed webhook payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    Delivery(#[from] relay_channels::DeliveryError),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

impl relay_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

relay_common::impl_context!();
