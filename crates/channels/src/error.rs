/// Crate-wide result type for outbound operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Why a segment did not reach the platform.
///
/// Cloneable so it can be kept in a queue's delivery record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The channel credentials were rejected.
    #[error("platform rejected channel credentials")]
    Unauthorized,

    /// The reply token was expired, unknown or already spent upstream.
    #[error("reply token rejected by platform")]
    InvalidToken,

    #[error("platform rate limit hit")]
    RateLimited,

    /// The request never got a response.
    #[error("network error: {message}")]
    Network { message: String },

    /// Any other non-success response.
    #[error("platform error ({status}): {body}")]
    Platform { status: u16, body: String },

    /// The reply handle is missing or its use budget is spent.
    #[error("reply handle exhausted")]
    HandleExhausted,
}

impl DeliveryError {
    #[must_use]
    pub fn network(message: impl std::fmt::Display) -> Self {
        Self::Network {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn platform(status: u16, body: impl Into<String>) -> Self {
        Self::Platform {
            status,
            body: body.into(),
        }
    }

    /// Whether the failure is tied to the reply token rather than the
    /// segment, so switching to the push API could still succeed.
    #[must_use]
    pub fn is_token_failure(&self) -> bool {
        matches!(self, Self::InvalidToken | Self::HandleExhausted)
    }
}
