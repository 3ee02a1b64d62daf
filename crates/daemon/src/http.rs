// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface: the chat webhook, the worker channel upgrade, health.
//!
//! One port. Components are assembled once by the supervisor and travel in
//! [`AppState`]; no globals, no ambient request state beyond the explicit
//! extractors.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use gf_chat::events::EventEnvelope;
use gf_chat::signature;
use gf_core::{Clock, SystemClock};
use gf_storage::{integrations, Db};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, warn};

use crate::channel::{socket, ChannelEvents, ChannelHandle};
use crate::env::Config;
use crate::router::Router;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Everything the HTTP handlers need, assembled once at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub channel: ChannelHandle,
    pub events: Arc<dyn ChannelEvents>,
    pub router: Arc<Router>,
    pub clock: SystemClock,
    pub config: Arc<Config>,
}

pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.allowed_origins);
    axum::Router::new()
        .route("/healthz", get(healthz))
        .route("/api/channel", get(socket::channel_upgrade))
        .route("/api/chat/events", post(chat_events))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let list: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new().allow_origin(AllowOrigin::list(list)).allow_methods(Any).allow_headers(Any)
}

async fn healthz() -> &'static str {
    "ok"
}

/// `POST /api/chat/events`: verified webhook intake.
async fn chat_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(secret) = state.config.signing_secret.as_deref() else {
        // non-strict mode with no secret: the integration is disabled
        return (StatusCode::SERVICE_UNAVAILABLE, "chat integration disabled").into_response();
    };

    let timestamp = header_str(&headers, TIMESTAMP_HEADER);
    let sig = header_str(&headers, SIGNATURE_HEADER);
    let (Some(timestamp), Some(sig)) = (timestamp, sig) else {
        return (StatusCode::UNAUTHORIZED, "missing signature headers").into_response();
    };
    if let Err(err) = signature::verify(secret, timestamp, &body, sig, state.clock.epoch_secs())
    {
        debug!(error = %err, "webhook signature rejected");
        return (StatusCode::UNAUTHORIZED, "bad signature").into_response();
    }

    let envelope: EventEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            debug!(error = %err, "unparseable webhook body");
            return (StatusCode::BAD_REQUEST, "unparseable event").into_response();
        }
    };

    match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            Json(json!({ "challenge": challenge })).into_response()
        }
        EventEnvelope::EventCallback { team_id, event } => {
            let integration = {
                let mut conn = match state.db.acquire().await {
                    Ok(conn) => conn,
                    Err(err) => {
                        warn!(error = %err, "webhook intake has no storage");
                        return StatusCode::SERVICE_UNAVAILABLE.into_response();
                    }
                };
                match integrations::get_by_workspace(&mut conn, state.db.schema(), &team_id)
                    .await
                {
                    Ok(found) => found,
                    Err(err) => {
                        warn!(error = %err, "integration lookup failed");
                        return StatusCode::SERVICE_UNAVAILABLE.into_response();
                    }
                }
            };
            let Some(integration) = integration else {
                debug!(workspace = %team_id, "event for unknown workspace acknowledged");
                return StatusCode::OK.into_response();
            };

            // handled inline so per-thread ordering follows the platform's
            // delivery order
            state.router.handle_chat_event(&integration, event).await;
            StatusCode::OK.into_response()
        }
        EventEnvelope::Other => StatusCode::OK.into_response(),
    }
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok()).filter(|s| !s.is_empty())
}
