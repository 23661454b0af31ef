use async_trait::async_trait;

use crate::{error::Result, segment::Segment};

/// Deliver segments to a messaging platform.
///
/// Implementations must accept between one and the platform's per-call
/// maximum of segments and deliver them in slice order.
#[async_trait]
pub trait ReplyApi: Send + Sync {
    /// Answer an inbound event with its reply token.
    async fn reply(&self, token: &str, segments: &[Segment]) -> Result<()>;

    /// Send to a user outside the reply window.
    async fn push(&self, to: &str, segments: &[Segment]) -> Result<()>;
}
