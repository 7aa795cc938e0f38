// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Analyzed-event operations, including the lifecycle transitions.
//!
//! Status moves one way only: the sweep takes `active` rows with a past due
//! date to `expired`; deletion removes the row. Nothing here ever writes a
//! status backward.

use std::str::FromStr;

use chrono::DateTime;
use earshot_core::types::{AnalyzedEvent, ConversationId, EventKind, EventStatus, NewEvent, Priority};
use earshot_core::{clock, EarshotError};
use rusqlite::params;

use crate::database::Database;

const EVENT_COLUMNS: &str = "id, kind, title, description, source_message_ids, group_id,
     due_date, priority, status, created_at, updated_at";

fn parse_enum_col<T: FromStr>(idx: usize, value: &str) -> Result<T, rusqlite::Error>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_event(row: &rusqlite::Row<'_>) -> Result<AnalyzedEvent, rusqlite::Error> {
    let kind: String = row.get(1)?;
    let ids_json: String = row.get(4)?;
    let group_id: Option<i64> = row.get(5)?;
    let due_date: Option<String> = row.get(6)?;
    let priority: String = row.get(7)?;
    let status: String = row.get(8)?;

    Ok(AnalyzedEvent {
        id: row.get(0)?,
        kind: parse_enum_col::<EventKind>(1, &kind)?,
        title: row.get(2)?,
        description: row.get(3)?,
        source_message_ids: serde_json::from_str(&ids_json).unwrap_or_default(),
        conversation: ConversationId::from_group_field(group_id),
        due_date: due_date
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok()),
        priority: parse_enum_col::<Priority>(7, &priority)?,
        status: parse_enum_col::<EventStatus>(8, &status)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Insert a validated event. Returns the auto-generated event id.
pub async fn insert_event(db: &Database, event: &NewEvent) -> Result<i64, EarshotError> {
    let event = event.clone();
    db.connection()
        .call(move |conn| {
            let ids_json =
                serde_json::to_string(&event.source_message_ids).unwrap_or_else(|_| "[]".into());
            conn.execute(
                "INSERT INTO analyzed_events (
                    kind, title, description, source_message_ids, group_id,
                    due_date, priority, status
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'active')",
                params![
                    event.kind.to_string(),
                    event.title,
                    event.description,
                    ids_json,
                    event.conversation.as_group(),
                    event.due_date.as_ref().map(clock::storage_string),
                    event.priority.to_string(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch recent events, newest first.
///
/// Completed events are always excluded; expired ones are included only when
/// `include_expired` is set. An optional kind narrows the result.
pub async fn recent(
    db: &Database,
    limit: i64,
    kind: Option<EventKind>,
    include_expired: bool,
) -> Result<Vec<AnalyzedEvent>, EarshotError> {
    db.connection()
        .call(move |conn| {
            let status_clause = if include_expired {
                "status IN ('active', 'expired')"
            } else {
                "status = 'active'"
            };
            let mut events = Vec::new();
            match kind {
                Some(kind) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {EVENT_COLUMNS} FROM analyzed_events
                         WHERE {status_clause} AND kind = ?1
                         ORDER BY created_at DESC
                         LIMIT ?2"
                    ))?;
                    let rows = stmt.query_map(params![kind.to_string(), limit], row_to_event)?;
                    for row in rows {
                        events.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {EVENT_COLUMNS} FROM analyzed_events
                         WHERE {status_clause}
                         ORDER BY created_at DESC
                         LIMIT ?1"
                    ))?;
                    let rows = stmt.query_map(params![limit], row_to_event)?;
                    for row in rows {
                        events.push(row?);
                    }
                }
            }
            Ok(events)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up a single event by id, regardless of status.
pub async fn find_by_id(db: &Database, id: i64) -> Result<Option<AnalyzedEvent>, EarshotError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM analyzed_events WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], row_to_event)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Transition every active event with a due date before `now` to expired.
///
/// Returns the number of rows transitioned. Idempotent: expired rows are
/// never matched again.
pub async fn mark_expired(
    db: &Database,
    now: &chrono::DateTime<chrono::FixedOffset>,
) -> Result<usize, EarshotError> {
    let cutoff = clock::storage_string(now);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE analyzed_events
                 SET status = 'expired',
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE status = 'active' AND due_date IS NOT NULL AND due_date < ?1",
                params![cutoff],
            )?;
            Ok(changed)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Hard-delete an event by id, regardless of status.
///
/// Returns `true` if a row was removed.
pub async fn delete(db: &Database, id: i64) -> Result<bool, EarshotError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM analyzed_events WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
