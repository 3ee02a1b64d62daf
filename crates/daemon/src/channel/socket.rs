// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket upgrade and per-connection socket loops.
//!
//! Auth happens before the upgrade: `X-AGENT-API-KEY` must resolve a
//! tenant and `X-AGENT-ID` must be a well-formed worker instance id.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use gf_core::{ConnectionId, WorkerId};
use gf_storage::tenants;
use gf_wire::WorkerMsg;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ChannelEvents, ChannelHandle, ClientMeta, OUTBOUND_QUEUE};
use crate::http::AppState;

pub const API_KEY_HEADER: &str = "x-agent-api-key";
pub const AGENT_ID_HEADER: &str = "x-agent-id";

/// `GET /api/channel`: authenticate, then upgrade.
pub async fn channel_upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(secret) = header_str(&headers, API_KEY_HEADER) else {
        return (StatusCode::UNAUTHORIZED, "missing agent api key").into_response();
    };
    let Some(worker_raw) = header_str(&headers, AGENT_ID_HEADER) else {
        return (StatusCode::UNAUTHORIZED, "missing agent id").into_response();
    };
    if !WorkerId::is_valid(worker_raw) {
        return (StatusCode::BAD_REQUEST, "malformed agent id").into_response();
    }

    let tenant = {
        let mut conn = match state.db.acquire().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(error = %err, "channel auth unavailable");
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
        };
        match tenants::get_by_secret(&mut conn, state.db.schema(), secret).await {
            Ok(Some(tenant)) => tenant,
            Ok(None) => return (StatusCode::UNAUTHORIZED, "unknown agent api key").into_response(),
            Err(err) => {
                warn!(error = %err, "channel auth lookup failed");
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
        }
    };

    let meta = ClientMeta {
        connection_id: ConnectionId::new(),
        tenant_id: tenant.id,
        worker_id: WorkerId::from_string(worker_raw),
    };
    let channel = state.channel.clone();
    let events = state.events.clone();
    ws.on_upgrade(move |socket| run_connection(channel, events, meta, socket))
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok()).filter(|s| !s.is_empty())
}

/// Own one worker connection: register, pump, deregister.
///
/// The connection scope is independent of the supervisor's root scope so
/// shutdown can drain handlers first and close the gateway afterwards.
async fn run_connection(
    channel: ChannelHandle,
    events: std::sync::Arc<dyn ChannelEvents>,
    meta: ClientMeta,
    socket: WebSocket,
) {
    let cancel = CancellationToken::new();
    let (out_tx, mut out_rx) = mpsc::channel(OUTBOUND_QUEUE);
    channel.insert(meta.clone(), out_tx, cancel.clone());

    if let Err(err) = events.agent_connected(&meta).await {
        warn!(
            connection = %meta.connection_id,
            worker = %meta.worker_id,
            error = %err,
            "refusing connection: registration failed"
        );
        channel.remove(&meta.connection_id);
        return;
    }
    info!(
        connection = %meta.connection_id,
        tenant = %meta.tenant_id,
        worker = %meta.worker_id,
        "worker connected"
    );

    let (mut sink, mut stream) = socket.split();

    // Writer task drains the outbound queue; the reader loop below is the
    // per-connection single consumer for inbound frames.
    let writer_cancel = cancel.clone();
    let writer_meta = meta.clone();
    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = writer_cancel.cancelled() => break,
                envelope = out_rx.recv() => {
                    let Some(envelope) = envelope else { break };
                    match gf_wire::encode(&envelope) {
                        Ok(text) => {
                            if sink.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            warn!(
                                connection = %writer_meta.connection_id,
                                error = %err,
                                "dropping unencodable envelope"
                            );
                        }
                    }
                }
            }
        }
        let _ = sink.close().await;
    });

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match gf_wire::decode::<WorkerMsg>(text.as_str()) {
                        Ok(envelope) => events.envelope(&meta, envelope).await,
                        Err(err) => {
                            warn!(
                                connection = %meta.connection_id,
                                error = %err,
                                "dropping malformed frame"
                            );
                        }
                    }
                }
                // liveness opcode, out of band from envelopes
                Some(Ok(Message::Ping(_))) => {
                    if let Err(err) = events.agent_ping(&meta).await {
                        warn!(
                            connection = %meta.connection_id,
                            error = %err,
                            "ping from unregistered worker, closing"
                        );
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // Pong / Binary
                Some(Err(err)) => {
                    debug!(connection = %meta.connection_id, error = %err, "transport error");
                    break;
                }
            },
        }
    }

    // Disconnect hooks run before the map entry goes away, so cleanup can
    // still resolve the connection.
    events.agent_disconnected(&meta).await;
    channel.remove(&meta.connection_id);
    cancel.cancel();
    let _ = writer.await;
    info!(connection = %meta.connection_id, worker = %meta.worker_id, "worker disconnected");
}
