// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the gateway protocol (OneBot 11 flavor).
//!
//! Two frame families arrive on the same socket: event envelopes (carrying a
//! `post_type`) and API responses to actions we sent earlier (carrying
//! `status` + `retcode` + `data`). [`Frame::classify`] tells them apart
//! before any deserialization into the typed envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message payload is either a plain string or an ordered list of typed
/// segments. Extraction pattern-matches on this union; no runtime probing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessagePayload {
    Text(String),
    Segments(Vec<Segment>),
}

impl MessagePayload {
    /// True when there is nothing to extract: an empty string or an empty
    /// segment list.
    pub fn is_empty(&self) -> bool {
        match self {
            MessagePayload::Text(s) => s.is_empty(),
            MessagePayload::Segments(segments) => segments.is_empty(),
        }
    }
}

/// One typed message segment. Unrecognized kinds pass through untouched so
/// newer gateway versions do not break deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Sender metadata attached to message events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub nickname: Option<String>,
    /// Role within the group: "owner", "admin", or "member".
    #[serde(default)]
    pub role: Option<String>,
}

/// An event envelope from the gateway.
///
/// Only `post_type` is guaranteed; everything else depends on the event
/// family, so all other fields are optional. Unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub post_type: String,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub message_id: Option<i64>,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub self_id: Option<i64>,
    #[serde(default)]
    pub sender: Option<Sender>,
    #[serde(default)]
    pub message: Option<MessagePayload>,
    #[serde(default)]
    pub raw_message: Option<String>,
    /// Event time, unix seconds.
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub meta_event_type: Option<String>,
    #[serde(default)]
    pub interval: Option<i64>,
}

/// A classified inbound frame.
#[derive(Debug)]
pub enum Frame {
    /// Response to an action request we sent. Logged, never routed further.
    ApiResponse {
        status: String,
        retcode: i64,
        echo: Option<String>,
    },
    /// An event envelope, kept alongside its raw JSON for persistence.
    Event { envelope: Box<Envelope>, raw: Value },
    /// Neither shape. Logged as non-standard and dropped.
    NonStandard(Value),
}

impl Frame {
    /// Classify a parsed JSON frame.
    ///
    /// API-response shape wins: `status` must be a string, `retcode` an
    /// integer, and a `data` field must be present (it may be null). A
    /// heartbeat meta-event also carries `status`, but as an object, so it
    /// never matches here.
    pub fn classify(value: Value) -> Frame {
        let is_api_response = value.get("status").is_some_and(Value::is_string)
            && value.get("retcode").is_some_and(Value::is_i64)
            && value.as_object().is_some_and(|o| o.contains_key("data"));

        if is_api_response {
            return Frame::ApiResponse {
                status: value["status"].as_str().unwrap_or_default().to_string(),
                retcode: value["retcode"].as_i64().unwrap_or_default(),
                echo: value
                    .get("echo")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            };
        }

        if value.get("post_type").is_some() {
            match serde_json::from_value::<Envelope>(value.clone()) {
                Ok(envelope) => {
                    return Frame::Event {
                        envelope: Box::new(envelope),
                        raw: value,
                    };
                }
                Err(_) => return Frame::NonStandard(value),
            }
        }

        Frame::NonStandard(value)
    }
}

/// An event accepted by the gateway and handed to the ingestion loop.
#[derive(Debug)]
pub struct InboundEvent {
    pub connection_id: String,
    pub envelope: Envelope,
    pub raw: Value,
}

/// Build the action frame that sends a private message to `user_id`.
pub fn private_message_action(user_id: i64, text: &str) -> Value {
    serde_json::json!({
        "action": "send_private_msg",
        "params": {
            "user_id": user_id.to_string(),
            "message": [{ "type": "text", "data": { "text": text } }]
        }
    })
}
