// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Two routes: an unauthenticated `/health` snapshot and the WebSocket
//! upgrade at `/` that the message gateway reverse-connects to.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use earshot_core::EarshotError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::auth::AuthConfig;
use crate::registry::ConnectionRegistry;
use crate::wire::InboundEvent;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Live connection registry.
    pub registry: Arc<ConnectionRegistry>,
    /// Channel delivering accepted message events to the ingestion loop.
    pub inbound_tx: mpsc::Sender<InboundEvent>,
    /// Handshake authentication configuration.
    pub auth: AuthConfig,
    /// Process start time for uptime reporting.
    pub start_time: std::time::Instant,
}

/// Gateway server bind configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Unauthenticated health snapshot.
async fn get_health(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    let snapshot = state.registry.snapshot();
    Json(serde_json::json!({
        "status": "healthy",
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "gateway": snapshot,
    }))
}

/// Start the gateway listener and serve until `shutdown` fires.
///
/// The message gateway connects to `ws://host:port/`; operators and probes
/// read `GET /health`.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), EarshotError> {
    let app = Router::new()
        .route("/health", get(get_health))
        .route("/", get(ws::ws_handler))
        .with_state(state)
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| EarshotError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on ws://{addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .map_err(|e| EarshotError::Channel {
        message: format!("gateway server error: {e}"),
        source: Some(Box::new(e)),
    })?;

    Ok(())
}
