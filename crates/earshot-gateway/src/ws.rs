// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket handler for reverse gateway connections.
//!
//! The message gateway dials in and streams event envelopes; we stream
//! action requests back over the same socket. Each connection gets:
//! 1. a writer task draining its registry mpsc receiver into the socket,
//! 2. a reader loop classifying frames and dispatching them.

use axum::{
    extract::{
        ConnectInfo, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tracing::{debug, info, warn};

use crate::auth;
use crate::server::GatewayState;
use crate::wire::{Frame, InboundEvent};

/// WebSocket upgrade handler.
///
/// Authentication happens here, on the handshake request, before the
/// protocol switch: a configured secret with a missing or wrong bearer
/// credential rejects the connection outright.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    if !auth::verify_handshake(&headers, &state.auth) {
        warn!(remote_addr = %addr, "gateway connection rejected: authentication failed");
        return (StatusCode::UNAUTHORIZED, "authentication failed").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, addr))
}

/// Handle one accepted gateway connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, state: GatewayState, addr: SocketAddr) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let connection_id = uuid::Uuid::new_v4().to_string();

    let (tx, mut rx) = tokio::sync::mpsc::channel::<String>(64);
    state
        .registry
        .register(&connection_id, &addr.to_string(), tx);
    info!(connection_id = %connection_id, remote_addr = %addr, "gateway connection accepted");

    // Writer task: registry sends land here and go out on the socket.
    let writer_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Greeting frame so the gateway side sees the link is live.
    let greeting = serde_json::json!({
        "type": "system",
        "message": "connection established",
        "server": "earshot",
    });
    state.registry.send(&connection_id, &greeting).await;

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => handle_frame(&state, &connection_id, &text).await,
            Message::Close(_) => break,
            // Binary frames are not part of the protocol; ping/pong is
            // handled by the websocket layer.
            _ => {}
        }
    }

    info!(connection_id = %connection_id, "gateway connection closed");
    state.registry.deregister(&connection_id);
    writer_task.abort();
}

/// Classify and dispatch one inbound frame.
async fn handle_frame(state: &GatewayState, connection_id: &str, text: &str) {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!(connection_id, error = %e, "unparseable frame dropped");
            return;
        }
    };

    match Frame::classify(value) {
        Frame::ApiResponse {
            status,
            retcode,
            echo,
        } => {
            // Responses to our own action requests: observability only.
            debug!(connection_id, %status, retcode, echo = ?echo, "api response");
        }
        Frame::Event { envelope, raw } => match envelope.post_type.as_str() {
            "meta_event" => handle_meta_event(state, connection_id, &envelope),
            "message" | "message_sent" => {
                let inbound = InboundEvent {
                    connection_id: connection_id.to_string(),
                    envelope: *envelope,
                    raw,
                };
                if state.inbound_tx.send(inbound).await.is_err() {
                    warn!(connection_id, "ingestion loop gone; message event dropped");
                }
            }
            // Reserved extension point: no business logic behind these yet.
            "notice" | "request" => {
                debug!(connection_id, post_type = %envelope.post_type, "event logged only");
            }
            other => {
                debug!(connection_id, post_type = %other, "unknown post_type dropped");
            }
        },
        Frame::NonStandard(value) => {
            warn!(connection_id, frame = %value, "non-standard frame dropped");
        }
    }
}

/// Lifecycle and heartbeat handling: the only frames that mutate
/// connection state.
fn handle_meta_event(state: &GatewayState, connection_id: &str, envelope: &crate::wire::Envelope) {
    match envelope.meta_event_type.as_deref() {
        Some("lifecycle") => match envelope.sub_type.as_deref() {
            Some("connect") | Some("enable") => {
                info!(
                    connection_id,
                    self_id = ?envelope.self_id,
                    "gateway authenticated via lifecycle event"
                );
                state.registry.mark_gateway(connection_id, envelope.self_id);
            }
            other => {
                debug!(connection_id, sub_type = ?other, "lifecycle sub_type ignored");
            }
        },
        Some("heartbeat") => {
            debug!(connection_id, interval = ?envelope.interval, "heartbeat");
            state.registry.touch_heartbeat(connection_id);
        }
        other => {
            debug!(connection_id, meta_event_type = ?other, "meta event ignored");
        }
    }
}
