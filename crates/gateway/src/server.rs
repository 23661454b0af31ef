use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    axum::{
        Json, Router,
        extract::State,
        response::IntoResponse,
        routing::{get, post},
    },
    relay_config::RelayConfig,
    relay_line::LineClient,
    relay_providers::{OpenAiProvider, TextGenerator},
    relay_sessions::SessionStore,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{info, warn},
};

use crate::{router::WebhookRouter, state::GatewayState, webhook::webhook_handler};

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the HTTP router (shared between production startup and tests).
pub fn build_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/webhook", post(webhook_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire the LINE client, text backend and session store from `config`,
/// then serve until Ctrl-C.
pub async fn start_server(config: RelayConfig) -> anyhow::Result<()> {
    let channel_secret = config
        .line
        .channel_secret
        .clone()
        .ok_or_else(|| anyhow::anyhow!("line.channel_secret is not set"))?;
    let client = LineClient::from_config(&config.line)?;

    let generator: Option<Arc<dyn TextGenerator>> =
        match OpenAiProvider::from_config(&config.provider) {
            Ok(provider) => Some(Arc::new(provider)),
            Err(e) => {
                warn!(error = %e, "text generation disabled, replies will use the apology text");
                None
            },
        };
    let provider_summary = generator
        .as_ref()
        .map(|g| format!("{} ({})", g.name(), g.id()))
        .unwrap_or_else(|| "none".into());

    let sessions = Arc::new(SessionStore::from_config(&config.sessions));
    let sweeper = sessions.spawn_sweeper(Duration::from_secs(
        config.sessions.sweep_interval_secs.max(1),
    ));

    let router = WebhookRouter::from_config(&config, Arc::new(client), generator, sessions);
    let state = GatewayState::new(channel_secret, router);
    let app = build_app(Arc::clone(&state));

    let listener =
        tokio::net::TcpListener::bind((config.server.bind.as_str(), config.server.port)).await?;
    let addr = listener.local_addr()?;

    // Startup banner.
    let outbound = &config.outbound;
    let lines = [
        format!("relay v{}", state.version),
        format!("listening on http://{addr}, webhook at /webhook"),
        format!("llm: {provider_summary}"),
        format!(
            "outbound: {:?}, {} ms interval, {} chars per segment",
            outbound.delivery_mode, outbound.dispatch_interval_ms, outbound.max_segment_length
        ),
        format!(
            "reply token: {} uses, push fallback {}",
            outbound.reply_token_max_uses,
            if outbound.push_fallback {
                "on"
            } else {
                "off"
            }
        ),
    ];
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.cancel();
    info!("relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
        "sessions": state.router.sessions().len(),
    }))
}
