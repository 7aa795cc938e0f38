// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The event classifier: pure predicates and extraction over wire envelopes.
//!
//! `should_process` is the filter chain deciding what enters the passive
//! queue; `transform` turns an accepted envelope into a persistable record.
//! Nothing here touches storage or the network.

use std::collections::HashSet;

use earshot_core::types::{ConversationId, NewMessage};
use earshot_gateway::wire::{Envelope, MessagePayload};
use serde_json::Value;
use tracing::debug;

/// Filters envelopes against the configured group allow-list.
///
/// The allow-list is fixed at construction and immutable afterward.
pub struct MessageFilter {
    listen_group_ids: HashSet<i64>,
}

impl MessageFilter {
    pub fn new(listen_group_ids: &[i64]) -> Self {
        Self {
            listen_group_ids: listen_group_ids.iter().copied().collect(),
        }
    }

    /// The configured allow-list.
    pub fn listen_group_ids(&self) -> &HashSet<i64> {
        &self.listen_group_ids
    }

    /// The filter chain. Order matters only for the log lines; every stage
    /// is independently sufficient to reject.
    pub fn should_process(&self, envelope: &Envelope) -> bool {
        if envelope.post_type.is_empty() || envelope.self_id.is_none() {
            debug!("envelope missing base fields; skipped");
            return false;
        }

        if envelope.post_type != "message" && envelope.post_type != "message_sent" {
            debug!(post_type = %envelope.post_type, "non-message event skipped");
            return false;
        }

        if envelope.message_type.as_deref() != Some("group") {
            debug!(message_type = ?envelope.message_type, "non-group message skipped");
            return false;
        }

        match envelope.group_id {
            Some(group_id) if self.listen_group_ids.contains(&group_id) => {}
            Some(group_id) => {
                debug!(group_id, "group not on the allow-list; skipped");
                return false;
            }
            None => {
                debug!("group message without group_id; skipped");
                return false;
            }
        }

        match &envelope.message {
            Some(payload) if !payload.is_empty() => {}
            _ => {
                debug!("empty message payload; skipped");
                return false;
            }
        }

        true
    }

    /// Extract the plain text of a payload.
    ///
    /// Text segments concatenate verbatim; mention segments render as
    /// `@<id> `; unrecognized segment kinds are ignored so newer gateways
    /// keep working. The result is whitespace-normalized.
    pub fn extract_text(&self, envelope: &Envelope) -> String {
        let Some(payload) = &envelope.message else {
            return String::new();
        };

        match payload {
            MessagePayload::Text(text) => clean_text(text),
            MessagePayload::Segments(segments) => {
                let mut text = String::new();
                for segment in segments {
                    match segment.kind.as_str() {
                        "text" => {
                            if let Some(t) = segment.data.get("text").and_then(Value::as_str) {
                                text.push_str(t);
                            }
                        }
                        "at" => {
                            if let Some(id) = mention_target(&segment.data) {
                                text.push_str(&format!("@{id} "));
                            }
                        }
                        _ => {}
                    }
                }
                clean_text(&text)
            }
        }
    }

    /// True when the sender holds an admin or owner role in its group.
    /// This is group-scoped privilege, unrelated to the global operator id.
    pub fn classify_privilege(&self, envelope: &Envelope) -> bool {
        matches!(
            envelope.sender.as_ref().and_then(|s| s.role.as_deref()),
            Some("admin") | Some("owner")
        )
    }

    /// Turn an accepted envelope into a persistable record.
    pub fn transform(&self, envelope: &Envelope, raw: &Value) -> NewMessage {
        NewMessage {
            source_message_id: envelope.message_id.unwrap_or_default(),
            conversation: ConversationId::from_group_field(envelope.group_id),
            sender_id: envelope.user_id.unwrap_or_default(),
            sender_nickname: envelope
                .sender
                .as_ref()
                .and_then(|s| s.nickname.clone())
                .filter(|n| !n.is_empty()),
            sender_is_privileged: self.classify_privilege(envelope),
            text: self.extract_text(envelope),
            raw_payload: raw.to_string(),
            timestamp: envelope.time.unwrap_or_default(),
            is_admin_message: false,
        }
    }
}

/// The mention target may arrive as a string or a number.
fn mention_target(data: &Value) -> Option<String> {
    match data.get("qq") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Collapse newlines and whitespace runs into single spaces.
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
