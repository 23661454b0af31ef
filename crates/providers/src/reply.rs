//! Turning a backend call into text that is always safe to send.

use {relay_config::ProviderConfig, tracing::warn};

use crate::TextGenerator;

/// Fixed replies used when the backend has nothing usable.
#[derive(Debug, Clone)]
pub struct ReplyTexts {
    /// Sent when the backend call fails.
    pub apology: String,
    /// Sent when the backend answers with blank text.
    pub empty: String,
}

impl From<&ProviderConfig> for ReplyTexts {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            apology: config.apology_text.clone(),
            empty: config.empty_reply_text.clone(),
        }
    }
}

impl Default for ReplyTexts {
    fn default() -> Self {
        Self::from(&ProviderConfig::default())
    }
}

/// Call the backend once and map every outcome to sendable text.
///
/// Failures are logged and replaced with the apology; they are never retried.
pub async fn generate_reply(
    generator: &dyn TextGenerator,
    prompt: &str,
    texts: &ReplyTexts,
) -> String {
    match generator.generate(prompt).await {
        Ok(text) => {
            let text = normalize_reply(&text);
            if text.is_empty() {
                texts.empty.clone()
            } else {
                text
            }
        },
        Err(e) => {
            warn!(
                provider = generator.name(),
                model = generator.id(),
                error = %e,
                "generation failed"
            );
            texts.apology.clone()
        },
    }
}

/// Plain-text cleanup for chat bubbles: code fences are dropped (LINE does
/// not render markdown), runs of blank lines collapse to one newline and
/// surrounding whitespace is trimmed.
pub fn normalize_reply(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let line = line.trim_end();
        if line.trim_start().starts_with("```") || line.trim().is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
    }
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, async_trait::async_trait};

    struct Canned(anyhow::Result<&'static str>);

    #[async_trait]
    impl TextGenerator for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn id(&self) -> &str {
            "canned-1"
        }

        async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            match &self.0 {
                Ok(text) => Ok((*text).to_string()),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }
    }

    #[tokio::test]
    async fn backend_error_becomes_apology() {
        let texts = ReplyTexts::default();
        let reply = generate_reply(&Canned(Err(anyhow::anyhow!("timeout"))), "q", &texts).await;
        assert_eq!(reply, "在生成文本時發生錯誤");
    }

    #[tokio::test]
    async fn blank_answer_becomes_fallback() {
        let texts = ReplyTexts::default();
        let reply = generate_reply(&Canned(Ok("  \n\n ")), "q", &texts).await;
        assert_eq!(reply, "抱歉，我沒有話可說了。");
    }

    #[tokio::test]
    async fn answer_is_normalized() {
        let texts = ReplyTexts::default();
        let reply = generate_reply(&Canned(Ok("第一段\n\n\n第二段  ")), "q", &texts).await;
        assert_eq!(reply, "第一段\n第二段");
    }

    #[test]
    fn code_fences_are_stripped() {
        let text = "看這段：\n```rust\nfn main() {}\n```\n完成";
        assert_eq!(normalize_reply(text), "看這段：\nfn main() {}\n完成");
    }

    #[test]
    fn indentation_inside_lines_is_kept() {
        assert_eq!(normalize_reply("  - a\n    - b"), "  - a\n    - b");
    }
}
