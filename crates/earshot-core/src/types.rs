// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the earshot crates.
//!
//! The event taxonomy is a closed set: the analysis prompt, the result
//! validator, and the admin rendering all enumerate exactly these variants,
//! so adding a category is a compile-time exercise rather than a string hunt.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Category of an extracted event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Todo,
    Notification,
    Entertainment,
}

impl EventKind {
    /// All kinds in display order (todos first, matching the operator listing).
    pub const ALL: [EventKind; 3] = [
        EventKind::Todo,
        EventKind::Notification,
        EventKind::Entertainment,
    ];
}

/// Priority assigned by the model, normalized to this closed set.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Lifecycle status of an analyzed event.
///
/// Transitions are monotone: `Active` -> `Expired` by the lifecycle sweep,
/// never backward. Deletion removes the row entirely and has no variant here.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Expired,
    Completed,
}

/// The conversation a message belongs to: a numbered group chat or the
/// operator's private channel.
///
/// Stored as a nullable `group_id` column; `NULL` is the private sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationId {
    Group(i64),
    Private,
}

impl ConversationId {
    /// The group id, or `None` for the private channel.
    pub fn as_group(&self) -> Option<i64> {
        match self {
            ConversationId::Group(id) => Some(*id),
            ConversationId::Private => None,
        }
    }

    /// Build from a nullable `group_id` column value.
    pub fn from_group_field(group_id: Option<i64>) -> Self {
        match group_id {
            Some(id) => ConversationId::Group(id),
            None => ConversationId::Private,
        }
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversationId::Group(id) => write!(f, "group {id}"),
            ConversationId::Private => write!(f, "private"),
        }
    }
}

/// A message accepted by the filter chain, ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// The gateway's message id (not our row id).
    pub source_message_id: i64,
    pub conversation: ConversationId,
    pub sender_id: i64,
    pub sender_nickname: Option<String>,
    /// Sender holds an admin/owner role in its group (distinct from the operator).
    pub sender_is_privileged: bool,
    pub text: String,
    /// Original wire envelope, serialized.
    pub raw_payload: String,
    /// Gateway event time, unix seconds.
    pub timestamp: i64,
    pub is_admin_message: bool,
}

/// A persisted message row.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: i64,
    pub source_message_id: i64,
    pub conversation: ConversationId,
    pub sender_id: i64,
    pub sender_nickname: Option<String>,
    pub sender_is_privileged: bool,
    pub text: String,
    pub raw_payload: String,
    pub timestamp: i64,
    pub is_admin_message: bool,
    /// Flipped 0 -> 1 exactly once, by the analysis batcher.
    pub processed: bool,
}

impl StoredMessage {
    /// Display name for prompt rendering: nickname, or a numeric fallback.
    pub fn display_name(&self) -> String {
        match &self.sender_nickname {
            Some(n) if !n.is_empty() => n.clone(),
            _ => format!("user {}", self.sender_id),
        }
    }
}

/// A validated event extracted by the model, ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub kind: EventKind,
    pub title: String,
    pub description: String,
    /// Row ids of the messages this event was extracted from.
    pub source_message_ids: Vec<i64>,
    pub conversation: ConversationId,
    pub due_date: Option<DateTime<FixedOffset>>,
    pub priority: Priority,
}

/// A persisted analyzed event.
#[derive(Debug, Clone)]
pub struct AnalyzedEvent {
    pub id: i64,
    pub kind: EventKind,
    pub title: String,
    pub description: String,
    pub source_message_ids: Vec<i64>,
    pub conversation: ConversationId,
    pub due_date: Option<DateTime<FixedOffset>>,
    pub priority: Priority,
    pub status: EventStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Terminal state bookkeeping for one batcher pass.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One row per batcher pass, recorded at start and finalized at the end.
#[derive(Debug, Clone)]
pub struct AnalysisTask {
    pub task_id: String,
    pub status: TaskStatus,
    pub message_count: i64,
    pub events_found: i64,
    pub error: Option<String>,
}
