//! Generative-text backends.
//!
//! The relay only needs `generate(prompt) -> text`; [`TextGenerator`] is
//! that seam and [`OpenAiProvider`] the production implementation.

pub mod openai;
pub mod reply;

pub use {
    openai::OpenAiProvider,
    reply::{ReplyTexts, generate_reply, normalize_reply},
};

use async_trait::async_trait;

/// A backend that turns a prompt into reply text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider name for logs (e.g. "openai").
    fn name(&self) -> &str;

    /// Model identifier (e.g. "gpt-3.5-turbo").
    fn id(&self) -> &str;

    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}
