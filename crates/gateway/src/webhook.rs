//! `POST /webhook`: signature check, payload parse, event routing.

use std::sync::Arc;

use {
    axum::{
        Json,
        body::Bytes,
        extract::State,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
    },
    relay_line::{
        WebhookPayload,
        signature::{self, SIGNATURE_HEADER},
    },
    secrecy::ExposeSecret,
    tracing::{debug, info, warn},
};

use crate::state::GatewayState;

fn reject(status: StatusCode, error: &str) -> Response {
    (status, Json(serde_json::json!({ "error": error }))).into_response()
}

/// The raw body is taken as bytes: the signature covers the exact bytes
/// LINE sent, so it must be checked before any parsing.
pub async fn webhook_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(header) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        warn!("webhook request without signature");
        return reject(StatusCode::UNAUTHORIZED, "missing signature");
    };
    if let Err(e) = signature::verify(state.channel_secret.expose_secret(), &body, header) {
        warn!(error = %e, "webhook signature rejected");
        return reject(StatusCode::UNAUTHORIZED, "invalid signature");
    }

    let payload = match WebhookPayload::parse(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "webhook payload rejected");
            return reject(StatusCode::BAD_REQUEST, "malformed payload");
        },
    };

    let received = payload.events.len();
    if received == 0 {
        debug!("empty webhook batch");
    }
    let outcomes = state.router.handle_events(payload.events).await;
    let queued = outcomes.iter().filter(|o| o.queue().is_some()).count();
    info!(received, queued, "webhook processed");

    Json(serde_json::json!({
        "status": "ok",
        "events": received,
        "queued": queued,
    }))
    .into_response()
}
