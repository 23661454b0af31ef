//! Webhook event routing.
//!
//! Every event is handled on its own: it gets its own reply handle and its
//! own [`DispatchQueue`], so two messages in one batch never share pacing
//! state or a token budget.

use std::sync::Arc;

use {
    futures::future::join_all,
    relay_channels::ReplyApi,
    relay_config::RelayConfig,
    relay_line::{DispatchConfig, DispatchQueue, Event, EventKind, Segmenter},
    relay_providers::{ReplyTexts, TextGenerator, generate_reply},
    relay_sessions::{SessionMode, SessionStore},
    tracing::{debug, info, warn},
};

use crate::{
    commands::{self, CommandAction, EXIT_REPLY},
    languages,
};

/// Why an event produced no reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not a text message or a recognised postback.
    Unsupported,
    /// Missing, blank or placeholder reply token.
    NoReplyHandle,
}

/// Result of handling one event.
#[derive(Debug)]
pub enum EventOutcome {
    Queued(DispatchQueue),
    Skipped(SkipReason),
}

impl EventOutcome {
    pub fn queue(&self) -> Option<&DispatchQueue> {
        match self {
            Self::Queued(queue) => Some(queue),
            Self::Skipped(_) => None,
        }
    }
}

pub struct WebhookRouter {
    api: Arc<dyn ReplyApi>,
    generator: Option<Arc<dyn TextGenerator>>,
    sessions: Arc<SessionStore>,
    segmenter: Segmenter,
    dispatch: DispatchConfig,
    reply_token_max_uses: usize,
    texts: ReplyTexts,
}

impl WebhookRouter {
    pub fn new(api: Arc<dyn ReplyApi>, sessions: Arc<SessionStore>) -> Self {
        let outbound = relay_config::OutboundConfig::default();
        Self {
            api,
            generator: None,
            sessions,
            segmenter: Segmenter::default(),
            dispatch: DispatchConfig::default(),
            reply_token_max_uses: outbound.reply_token_max_uses,
            texts: ReplyTexts::default(),
        }
    }

    pub fn from_config(
        config: &RelayConfig,
        api: Arc<dyn ReplyApi>,
        generator: Option<Arc<dyn TextGenerator>>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            api,
            generator,
            sessions,
            segmenter: Segmenter::from_config(&config.outbound),
            dispatch: DispatchConfig::from(&config.outbound),
            reply_token_max_uses: config.outbound.reply_token_max_uses.max(1),
            texts: ReplyTexts::from(&config.provider),
        }
    }

    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    #[must_use]
    pub fn with_segmenter(mut self, segmenter: Segmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    #[must_use]
    pub fn with_dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Handle a webhook batch. Events run concurrently; outcomes keep the
    /// batch order.
    pub async fn handle_events(&self, events: Vec<Event>) -> Vec<EventOutcome> {
        join_all(events.into_iter().map(|event| self.handle_event(event))).await
    }

    pub async fn handle_event(&self, mut event: Event) -> EventOutcome {
        let supported = match event.kind {
            EventKind::Message => event.text().is_some(),
            EventKind::Postback => event.postback_data().is_some(),
            _ => false,
        };
        if !supported {
            debug!(kind = ?event.kind, "ignoring event");
            return EventOutcome::Skipped(SkipReason::Unsupported);
        }

        let Some(handle) = event.take_reply_handle(self.reply_token_max_uses) else {
            info!(
                event_id = event.webhook_event_id.as_deref().unwrap_or("-"),
                "event has no usable reply token"
            );
            return EventOutcome::Skipped(SkipReason::NoReplyHandle);
        };

        let user_id = event.user_id();
        let reply = match (event.text(), event.postback_data()) {
            (Some(text), _) => Some(self.reply_to_text(user_id, text).await),
            (None, Some(data)) => self.reply_to_postback(user_id, data),
            (None, None) => None,
        };
        let Some(reply) = reply else {
            debug!("postback not handled");
            return EventOutcome::Skipped(SkipReason::Unsupported);
        };

        let segments = self.segmenter.pack([reply.as_str()]);
        let queue = DispatchQueue::new(handle, Arc::clone(&self.api), self.dispatch.clone());
        debug!(segment_count = segments.len(), "reply queued");
        if let Err(e) = queue.submit(segments) {
            warn!(error = %e, "could not queue reply");
        }
        EventOutcome::Queued(queue)
    }

    async fn reply_to_text(&self, user_id: Option<&str>, text: &str) -> String {
        let mode = user_id
            .map(|u| self.sessions.touch(u))
            .unwrap_or_default();

        match commands::resolve(text) {
            Some(CommandAction::Reply(reply)) => reply,
            Some(CommandAction::EnterTranslation { language }) => {
                match user_id {
                    Some(u) => self.sessions.set_mode(u, SessionMode::Translate {
                        language: language.to_string(),
                    }),
                    None => debug!("translation mode needs a user id, not persisted"),
                }
                format!("已切換為翻譯模式，接下來的訊息會翻譯成{language}。輸入 /退出 可以離開。")
            },
            Some(CommandAction::Delegate { prompt }) => self.generate(&prompt).await,
            Some(CommandAction::Exit) => {
                if let Some(u) = user_id {
                    self.sessions.reset(u);
                }
                EXIT_REPLY.to_string()
            },
            None => match mode {
                SessionMode::Chat => self.generate(text).await,
                SessionMode::Translate { language } => {
                    self.generate(&languages::translation_prompt(&language, text))
                        .await
                },
            },
        }
    }

    fn reply_to_postback(&self, user_id: Option<&str>, data: &str) -> Option<String> {
        let language = languages::lookup(data)?;
        if let Some(u) = user_id {
            self.sessions.set_mode(u, SessionMode::Translate {
                language: language.name.to_string(),
            });
        }
        Some(format!(
            "您選擇了 {} 語言，語言模式已切換。現在您可以輸入文字進行翻譯喔。",
            language.name
        ))
    }

    async fn generate(&self, prompt: &str) -> String {
        match &self.generator {
            Some(generator) => generate_reply(generator.as_ref(), prompt, &self.texts).await,
            None => {
                warn!("no text generator configured");
                self.texts.apology.clone()
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::{
        sync::Mutex,
        time::Duration,
    };

    use {
        super::*,
        async_trait::async_trait,
        relay_channels::{DeliveryError, Segment},
        relay_line::{Outcome, WebhookPayload},
    };

    #[derive(Default)]
    struct RecordingApi {
        replies: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl ReplyApi for RecordingApi {
        async fn reply(&self, token: &str, segments: &[Segment]) -> Result<(), DeliveryError> {
            self.replies.lock().unwrap().push((
                token.to_string(),
                segments.iter().map(|s| s.content().to_string()).collect(),
            ));
            Ok(())
        }

        async fn push(&self, _to: &str, _segments: &[Segment]) -> Result<(), DeliveryError> {
            Err(DeliveryError::Unauthorized)
        }
    }

    /// Echoes the prompt so tests can see what the backend was asked.
    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn id(&self) -> &str {
            "echo-1"
        }

        async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            Ok(prompt.to_string())
        }
    }

    fn router(api: Arc<RecordingApi>) -> WebhookRouter {
        WebhookRouter::new(api, Arc::new(SessionStore::new(Duration::from_secs(600))))
            .with_generator(Arc::new(Echo))
    }

    fn text_event(token: &str, user: &str, text: &str) -> Event {
        let body = serde_json::json!({
            "events": [{
                "type": "message",
                "replyToken": token,
                "source": {"type": "user", "userId": user},
                "message": {"type": "text", "id": "1", "text": text},
            }]
        });
        WebhookPayload::parse(body.to_string().as_bytes())
            .unwrap()
            .events
            .remove(0)
    }

    fn postback_event(token: &str, user: &str, data: &str) -> Event {
        let body = serde_json::json!({
            "events": [{
                "type": "postback",
                "replyToken": token,
                "source": {"type": "user", "userId": user},
                "postback": {"data": data},
            }]
        });
        WebhookPayload::parse(body.to_string().as_bytes())
            .unwrap()
            .events
            .remove(0)
    }

    async fn delivered(outcome: &EventOutcome) -> Vec<String> {
        let queue = outcome.queue().expect("event should be queued");
        queue.wait_idle().await;
        queue
            .records()
            .into_iter()
            .filter(|r| matches!(r.outcome, Outcome::Delivered { .. }))
            .map(|r| r.segment.into_content())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn chat_text_goes_to_backend() {
        let api = Arc::new(RecordingApi::default());
        let router = router(Arc::clone(&api));
        let outcome = router.handle_event(text_event("tok", "U1", "你好")).await;
        assert_eq!(delivered(&outcome).await, vec!["你好"]);
        assert_eq!(api.replies.lock().unwrap()[0].0, "tok");
    }

    #[tokio::test(start_paused = true)]
    async fn placeholder_token_is_skipped() {
        let api = Arc::new(RecordingApi::default());
        let router = router(Arc::clone(&api));
        let outcome = router
            .handle_event(text_event("00000000000000000000000000000000", "U1", "hi"))
            .await;
        assert!(matches!(outcome, EventOutcome::Skipped(SkipReason::NoReplyHandle)));
        assert!(api.replies.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn translation_mode_wraps_prompt_until_exit() {
        let api = Arc::new(RecordingApi::default());
        let router = router(Arc::clone(&api));

        let outcome = router.handle_event(text_event("t1", "U1", "/翻譯助理 日文")).await;
        assert!(delivered(&outcome).await[0].contains("日文"));

        let outcome = router.handle_event(text_event("t2", "U1", "早安")).await;
        let reply = delivered(&outcome).await.join("");
        assert_eq!(reply, languages::translation_prompt("日文", "早安"));

        let outcome = router.handle_event(text_event("t3", "U1", "/退出")).await;
        assert_eq!(delivered(&outcome).await, vec![EXIT_REPLY]);

        let outcome = router.handle_event(text_event("t4", "U1", "早安")).await;
        assert_eq!(delivered(&outcome).await, vec!["早安"]);
    }

    #[tokio::test(start_paused = true)]
    async fn postback_switches_language() {
        let api = Arc::new(RecordingApi::default());
        let router = router(Arc::clone(&api));

        let outcome = router.handle_event(postback_event("t1", "U1", "英文")).await;
        assert_eq!(delivered(&outcome).await, vec![
            "您選擇了 英文 語言，語言模式已切換。現在您可以輸入文字進行翻譯喔。"
        ]);
        assert_eq!(router.sessions().mode("U1"), SessionMode::Translate {
            language: "英文".into()
        });

        let outcome = router.handle_event(postback_event("t2", "U1", "menu")).await;
        assert!(matches!(outcome, EventOutcome::Skipped(SkipReason::Unsupported)));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_generator_replies_with_apology() {
        let api = Arc::new(RecordingApi::default());
        let router = WebhookRouter::new(
            api,
            Arc::new(SessionStore::new(Duration::from_secs(60))),
        );
        let outcome = router.handle_event(text_event("tok", "U1", "hi")).await;
        assert_eq!(delivered(&outcome).await, vec!["在生成文本時發生錯誤"]);
    }

    #[tokio::test(start_paused = true)]
    async fn long_reply_is_segmented() {
        let api = Arc::new(RecordingApi::default());
        let router = router(Arc::clone(&api)).with_segmenter(Segmenter::new(4, "。"));
        let outcome = router.handle_event(text_event("tok", "U1", "一二三。四五六。")).await;
        assert_eq!(delivered(&outcome).await, vec!["一二三。", "四五六。"]);
    }
}
