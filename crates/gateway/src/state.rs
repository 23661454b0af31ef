use std::sync::Arc;

use secrecy::Secret;

use crate::router::WebhookRouter;

/// Shared state behind every request.
pub struct GatewayState {
    /// Secret used to check `x-line-signature`.
    pub channel_secret: Secret<String>,
    pub router: WebhookRouter,
    pub version: String,
}

impl GatewayState {
    pub fn new(channel_secret: Secret<String>, router: WebhookRouter) -> Arc<Self> {
        Arc::new(Self {
            channel_secret,
            router,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}
