//! Inbound webhook payload types.

use {relay_channels::ReplyHandle, serde::Deserialize};

use crate::error::Result;

/// Top-level webhook body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Bot user id the events were sent to.
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl WebhookPayload {
    pub fn parse(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Message,
    Postback,
    Follow,
    Unfollow,
    Join,
    Leave,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub reply_token: Option<String>,
    pub message: Option<Message>,
    pub postback: Option<Postback>,
    #[serde(default)]
    pub source: Source,
    pub timestamp: Option<i64>,
    pub webhook_event_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    File,
    Location,
    Sticker,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub id: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postback {
    pub data: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub room_id: Option<String>,
}

/// Reply tokens LINE sends with console "Verify" requests; replying to
/// them always fails.
const PLACEHOLDER_TOKENS: &[&str] = &[
    "00000000000000000000000000000000",
    "ffffffffffffffffffffffffffffffff",
];

impl Event {
    /// Text of a text message event.
    pub fn text(&self) -> Option<&str> {
        let message = self.message.as_ref()?;
        if message.kind != MessageKind::Text {
            return None;
        }
        message.text.as_deref()
    }

    pub fn postback_data(&self) -> Option<&str> {
        self.postback.as_ref().map(|p| p.data.as_str())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.source.user_id.as_deref()
    }

    /// Move this event's reply token out as a [`ReplyHandle`]. Later calls
    /// return `None`, so one event yields at most one handle.
    ///
    /// Missing, blank and verification placeholder tokens yield `None`.
    pub fn take_reply_handle(&mut self, max_uses: usize) -> Option<ReplyHandle> {
        let token = self.reply_token.take()?;
        let token = token.trim();
        if token.is_empty() || PLACEHOLDER_TOKENS.contains(&token) {
            return None;
        }
        let handle = ReplyHandle::new(token, max_uses);
        Some(match self.user_id() {
            Some(user_id) => handle.with_user_id(user_id),
            None => handle,
        })
    }
}
