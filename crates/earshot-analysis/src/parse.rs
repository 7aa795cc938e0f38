// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validation of model output.
//!
//! The model is asked for a strict JSON object but is not trusted to return
//! one: fenced wrappers are tolerated, invalid items are dropped one at a
//! time, and out-of-range values are normalized rather than rejected. A bad
//! item never takes down its siblings.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use earshot_core::clock;
use earshot_core::types::{EventKind, Priority};
use serde_json::Value;
use tracing::{debug, warn};

/// Maximum title length, in characters.
const TITLE_MAX_CHARS: usize = 200;
/// Maximum description length, in characters.
const DESCRIPTION_MAX_CHARS: usize = 500;

/// One validated event from the model, not yet tied to source messages.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEvent {
    pub kind: EventKind,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<DateTime<FixedOffset>>,
}

/// Parse and validate the raw model output.
///
/// Returns the events that survived validation; an unparseable payload
/// yields an empty list (logged), never an error -- recall loss is preferred
/// over failing the unit twice.
pub fn parse_result(raw: &str) -> Vec<ParsedEvent> {
    let json_text = extract_json(raw);

    let top: Value = match serde_json::from_str(json_text) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, raw_len = raw.len(), "model output is not JSON; dropping");
            return Vec::new();
        }
    };

    let Some(items) = top.get("events").and_then(Value::as_array) else {
        warn!("model output missing `events` array; dropping");
        return Vec::new();
    };

    items.iter().filter_map(validate_item).collect()
}

/// Strip an optional fenced code block wrapper.
fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    for fence in ["```json", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let body = &trimmed[start + fence.len()..];
            if let Some(end) = body.find("```") {
                return body[..end].trim();
            }
        }
    }
    trimmed
}

/// Validate one event item. `None` drops only this item.
fn validate_item(item: &Value) -> Option<ParsedEvent> {
    let kind_str = item.get("type").and_then(Value::as_str).unwrap_or_default();
    let kind = match EventKind::from_str(kind_str) {
        Ok(kind) => kind,
        Err(_) => {
            warn!(kind = kind_str, "unsupported event type; item dropped");
            return None;
        }
    };

    let title = item.get("title").and_then(Value::as_str).unwrap_or_default();
    let description = item
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if title.is_empty() || description.is_empty() {
        warn!(kind = %kind, "item missing title or description; dropped");
        return None;
    }

    // Invalid priority and unparseable due date are normalized, not fatal.
    let priority = item
        .get("priority")
        .and_then(Value::as_str)
        .and_then(|s| Priority::from_str(s).ok())
        .unwrap_or_default();

    let due_date = item
        .get("due_date")
        .and_then(Value::as_str)
        .and_then(|s| {
            let parsed = parse_due_date(s);
            if parsed.is_none() {
                debug!(due_date = s, "unparseable due date normalized to none");
            }
            parsed
        });

    Some(ParsedEvent {
        kind,
        title: clamp_chars(title, TITLE_MAX_CHARS),
        description: clamp_chars(description, DESCRIPTION_MAX_CHARS),
        priority,
        due_date,
    })
}

/// Truncate to at most `max` characters, never splitting a char boundary.
fn clamp_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Normalize a due-date string to the fixed civil offset.
///
/// Accepts RFC 3339, the `YYYY-MM-DD HH:MM:SS` shape the prompt requests,
/// and a bare date (midnight). Naive values are interpreted in the civil
/// offset. Anything else is `None`.
pub fn parse_due_date(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&clock::civil_offset()));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return naive.and_local_timezone(clock::civil_offset()).single();
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)?
            .and_local_timezone(clock::civil_offset())
            .single();
    }

    None
}
