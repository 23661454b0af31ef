//! LINE Messaging API client for reply and push calls.

use std::time::Duration;

use {
    async_trait::async_trait,
    relay_channels::{DeliveryError, ReplyApi, Segment},
    relay_config::LineConfig,
    secrecy::{ExposeSecret, Secret},
    serde::Serialize,
    tracing::{debug, warn},
};

use crate::error::{Context, Result};

const REPLY_PATH: &str = "/v2/bot/message/reply";
const PUSH_PATH: &str = "/v2/bot/message/push";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: &'a [Segment],
}

#[derive(Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: &'a [Segment],
}

/// Reply/push sender authenticated with the channel access token.
pub struct LineClient {
    http: reqwest::Client,
    api_base: String,
    access_token: Secret<String>,
}

impl LineClient {
    pub fn new(
        api_base: impl Into<String>,
        access_token: Secret<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token,
        })
    }

    pub fn from_config(config: &LineConfig) -> Result<Self> {
        let token = config
            .channel_access_token
            .clone()
            .context("line.channel_access_token is not set")?;
        Self::new(
            config.api_base.clone(),
            token,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<(), DeliveryError> {
        let url = format!("{}{path}", self.api_base);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(self.access_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(path, error = %e, "LINE request failed to send");
                DeliveryError::network(e)
            })?;

        let status = resp.status();
        if status.is_success() {
            debug!(path, %status, "LINE request accepted");
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(classify_failure(status.as_u16(), body))
    }
}

fn classify_failure(status: u16, body: String) -> DeliveryError {
    match status {
        401 | 403 => DeliveryError::Unauthorized,
        429 => DeliveryError::RateLimited,
        400 if body.to_ascii_lowercase().contains("invalid reply token") => {
            DeliveryError::InvalidToken
        },
        _ => DeliveryError::platform(status, body),
    }
}

#[async_trait]
impl ReplyApi for LineClient {
    async fn reply(&self, token: &str, segments: &[Segment]) -> relay_channels::Result<()> {
        self.post(REPLY_PATH, &ReplyRequest {
            reply_token: token,
            messages: segments,
        })
        .await
    }

    async fn push(&self, to: &str, segments: &[Segment]) -> relay_channels::Result<()> {
        self.post(PUSH_PATH, &PushRequest {
            to,
            messages: segments,
        })
        .await
    }
}
