use {
    std::{
        fmt,
        sync::atomic::{AtomicUsize, Ordering},
    },
    tracing::debug,
};

use crate::error::{DeliveryError, Result};

/// Permission to answer one inbound event.
///
/// Owned by exactly one dispatch queue: the type is neither `Clone` nor
/// `Copy`, so two queues cannot hold the same handle. Each platform call
/// spends one use from a bounded budget; once spent (or retired) every
/// further [`acquire`](Self::acquire) fails with
/// [`DeliveryError::HandleExhausted`].
pub struct ReplyHandle {
    token: String,
    user_id: Option<String>,
    max_uses: usize,
    used: AtomicUsize,
}

impl ReplyHandle {
    pub fn new(token: impl Into<String>, max_uses: usize) -> Self {
        Self {
            token: token.into(),
            user_id: None,
            max_uses,
            used: AtomicUsize::new(0),
        }
    }

    /// Attach the recipient for push delivery once the token is spent.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Spend one use and return the token to call the platform with.
    pub fn acquire(&self) -> Result<&str> {
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.max_uses).then_some(used + 1)
            })
            .map(|_| self.token.as_str())
            .map_err(|_| DeliveryError::HandleExhausted)
    }

    pub fn remaining(&self) -> usize {
        self.max_uses
            .saturating_sub(self.used.load(Ordering::Acquire))
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Spend whatever budget is left. Idempotent.
    pub fn retire(&self) {
        let previous = self.used.swap(self.max_uses, Ordering::AcqRel);
        if previous < self.max_uses {
            debug!(
                unused = self.max_uses - previous,
                "reply handle retired with budget left"
            );
        }
    }
}

impl fmt::Debug for ReplyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyHandle")
            .field("token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("remaining", &self.remaining())
            .finish()
    }
}
