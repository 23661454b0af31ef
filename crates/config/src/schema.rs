//! Config schema types (server, LINE channel, outbound pacing, provider, sessions).
use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub line: LineConfig,
    pub outbound: OutboundConfig,
    pub provider: ProviderConfig,
    pub sessions: SessionsConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "0.0.0.0".
    pub bind: String,
    /// Port to listen on. Defaults to 3000.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

/// LINE Messaging API channel credentials and endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Long-lived channel access token used as bearer auth on outbound calls.
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub channel_access_token: Option<Secret<String>>,
    /// Channel secret used to verify `x-line-signature`.
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub channel_secret: Option<Secret<String>>,
    pub api_base: String,
    pub request_timeout_secs: u64,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_access_token: None,
            channel_secret: None,
            api_base: "https://api.line.me".into(),
            request_timeout_secs: 10,
        }
    }
}

/// How the dispatch queue groups segments into platform calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// One segment per tick.
    #[default]
    Paced,
    /// Up to `max_segments_per_call` segments per tick, in a single call.
    Batched,
}

/// Outbound chunking and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboundConfig {
    /// Maximum characters per text segment.
    pub max_segment_length: usize,
    /// Minimum spacing between platform calls made by one dispatch queue.
    pub dispatch_interval_ms: u64,
    /// Upper bound on segments carried by a single reply/push call.
    pub max_segments_per_call: usize,
    pub delivery_mode: DeliveryMode,
    /// Abandon the reply handle after this many failures in a row.
    pub max_consecutive_failures: u32,
    /// How many platform calls one reply token may back.
    pub reply_token_max_uses: usize,
    /// Deliver through the push API once the reply token is used up.
    pub push_fallback: bool,
    /// Characters the segmenter may cut after when no newline fits.
    pub sentence_terminators: String,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            max_segment_length: 2000,
            dispatch_interval_ms: 100,
            max_segments_per_call: 5,
            delivery_mode: DeliveryMode::Paced,
            max_consecutive_failures: 3,
            reply_token_max_uses: 5,
            push_fallback: false,
            sentence_terminators: "。！？".into(),
        }
    }
}

/// OpenAI-compatible chat-completions backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Reply sent when the backend call fails.
    pub apology_text: String,
    /// Reply sent when the backend answers with nothing.
    pub empty_reply_text: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-3.5-turbo".into(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 60,
            apology_text: "在生成文本時發生錯誤".into(),
            empty_reply_text: "抱歉，我沒有話可說了。".into(),
        }
    }
}

/// Per-user session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Sessions untouched for this long are dropped.
    pub idle_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: 1800,
            sweep_interval_secs: 60,
        }
    }
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
