use std::time::Duration;

use {
    async_trait::async_trait,
    relay_config::ProviderConfig,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tracing::{debug, warn},
};

use crate::TextGenerator;

/// OpenAI-compatible `/chat/completions` backend.
pub struct OpenAiProvider {
    api_key: Secret<String>,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(api_key: Secret<String>, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> anyhow::Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("provider.api_key is not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            ..Self::new(api_key, config.model.clone(), config.base_url.clone())
        })
    }

    #[must_use]
    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl TextGenerator for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "openai completion request"
        );

        let http_resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = http_resp.status();
        if !status.is_success() {
            let body_text = http_resp.text().await.unwrap_or_default();
            warn!(status = %status, model = %self.model, body = %body_text, "openai API error");
            anyhow::bail!("OpenAI API error HTTP {status}: {body_text}");
        }

        let resp: ChatResponse = http_resp.json().await?;
        let content = resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();
        Ok(content.trim().to_string())
    }
}
