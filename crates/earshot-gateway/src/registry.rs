// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection registry: per-connection state plus the outbound send paths.
//!
//! Each accepted socket registers an mpsc sender here; the socket's writer
//! task drains the matching receiver. `broadcast` walks every live
//! connection -- there is no per-gateway targeting, so with more than one
//! connected gateway an action is delivered to all of them (known semantic
//! gap, surfaced as a warning by callers that care).

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use dashmap::DashMap;
use earshot_core::Clock;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Mutable per-connection state.
struct Connection {
    sender: mpsc::Sender<String>,
    remote_addr: String,
    connected_at: DateTime<FixedOffset>,
    last_heartbeat: DateTime<FixedOffset>,
    is_gateway: bool,
    self_id: Option<i64>,
}

/// Read-only view of one connection, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSummary {
    pub id: String,
    pub remote_addr: String,
    pub connected_at: String,
    pub last_heartbeat: String,
    pub is_gateway: bool,
    pub self_id: Option<i64>,
}

/// Aggregate registry snapshot, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    /// At least one authenticated gateway connection is live.
    pub connected: bool,
    pub client_count: usize,
    pub gateway_count: usize,
    pub connections: Vec<ConnectionSummary>,
}

/// Registry of live gateway connections.
pub struct ConnectionRegistry {
    connections: DashMap<String, Connection>,
    clock: Arc<dyn Clock>,
}

impl ConnectionRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            connections: DashMap::new(),
            clock,
        }
    }

    /// Register a freshly accepted connection.
    pub fn register(&self, id: &str, remote_addr: &str, sender: mpsc::Sender<String>) {
        let now = self.clock.now();
        self.connections.insert(
            id.to_string(),
            Connection {
                sender,
                remote_addr: remote_addr.to_string(),
                connected_at: now,
                last_heartbeat: now,
                is_gateway: false,
                self_id: None,
            },
        );
        debug!(connection_id = %id, remote_addr, "connection registered");
    }

    /// Remove a closed connection.
    pub fn deregister(&self, id: &str) {
        self.connections.remove(id);
        debug!(connection_id = %id, "connection deregistered");
    }

    /// Mark a connection as an authenticated gateway (lifecycle meta-event)
    /// and record the account it serves.
    pub fn mark_gateway(&self, id: &str, self_id: Option<i64>) {
        if let Some(mut conn) = self.connections.get_mut(id) {
            conn.is_gateway = true;
            conn.self_id = self_id;
            conn.last_heartbeat = self.clock.now();
        }
    }

    /// Refresh a connection's heartbeat timestamp.
    pub fn touch_heartbeat(&self, id: &str) {
        if let Some(mut conn) = self.connections.get_mut(id) {
            conn.last_heartbeat = self.clock.now();
        }
    }

    /// Send a JSON payload to one connection. Returns `false` if the
    /// connection is gone or its writer task has stopped.
    pub async fn send(&self, id: &str, payload: &Value) -> bool {
        let sender = match self.connections.get(id) {
            Some(conn) => conn.sender.clone(),
            None => return false,
        };
        match sender.send(payload.to_string()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(connection_id = %id, "send failed: writer task gone");
                false
            }
        }
    }

    /// Send a JSON payload to every live connection. Returns the number of
    /// connections the payload was delivered to.
    pub async fn broadcast(&self, payload: &Value) -> usize {
        let targets: Vec<(String, mpsc::Sender<String>)> = self
            .connections
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().sender.clone()))
            .collect();

        let text = payload.to_string();
        let mut delivered = 0;
        for (id, sender) in targets {
            if sender.send(text.clone()).await.is_ok() {
                delivered += 1;
            } else {
                warn!(connection_id = %id, "broadcast skipped dead connection");
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Observability snapshot of the whole registry.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let connections: Vec<ConnectionSummary> = self
            .connections
            .iter()
            .map(|entry| ConnectionSummary {
                id: entry.key().clone(),
                remote_addr: entry.remote_addr.clone(),
                connected_at: entry.connected_at.to_rfc3339(),
                last_heartbeat: entry.last_heartbeat.to_rfc3339(),
                is_gateway: entry.is_gateway,
                self_id: entry.self_id,
            })
            .collect();
        let gateway_count = connections.iter().filter(|c| c.is_gateway).count();
        RegistrySnapshot {
            connected: gateway_count > 0,
            client_count: connections.len(),
            gateway_count,
            connections,
        }
    }
}
