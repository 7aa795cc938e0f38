// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingested-message operations.

use earshot_core::types::{ConversationId, NewMessage, StoredMessage};
use earshot_core::EarshotError;
use rusqlite::params;

use crate::database::Database;

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<StoredMessage, rusqlite::Error> {
    let group_id: Option<i64> = row.get(2)?;
    Ok(StoredMessage {
        id: row.get(0)?,
        source_message_id: row.get(1)?,
        conversation: ConversationId::from_group_field(group_id),
        sender_id: row.get(3)?,
        sender_nickname: row.get(4)?,
        sender_is_privileged: row.get::<_, i64>(5)? != 0,
        text: row.get(6)?,
        raw_payload: row.get(7)?,
        timestamp: row.get(8)?,
        is_admin_message: row.get::<_, i64>(9)? != 0,
        processed: row.get::<_, i64>(10)? != 0,
    })
}

const MESSAGE_COLUMNS: &str = "id, source_message_id, group_id, sender_id, sender_nickname,
     sender_is_privileged, content, raw_payload, timestamp, is_admin_message, processed";

/// Insert a new message. Returns the auto-generated row id.
pub async fn insert_message(db: &Database, msg: &NewMessage) -> Result<i64, EarshotError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (
                    source_message_id, group_id, sender_id, sender_nickname,
                    sender_is_privileged, content, raw_payload, timestamp, is_admin_message
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    msg.source_message_id,
                    msg.conversation.as_group(),
                    msg.sender_id,
                    msg.sender_nickname,
                    msg.sender_is_privileged as i64,
                    msg.text,
                    msg.raw_payload,
                    msg.timestamp,
                    msg.is_admin_message as i64,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch up to `limit` unprocessed messages, oldest first.
pub async fn unprocessed(db: &Database, limit: i64) -> Result<Vec<StoredMessage>, EarshotError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE processed = 0
                 ORDER BY timestamp ASC
                 LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a set of message row ids processed. Returns the number of rows
/// changed; ids already processed are counted again (the UPDATE is
/// unconditional) so callers pass each id at most once per pass.
pub async fn mark_processed(db: &Database, ids: &[i64]) -> Result<usize, EarshotError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| {
            let placeholders = std::iter::repeat_n("?", ids.len())
                .collect::<Vec<_>>()
                .join(",");
            let sql = format!("UPDATE messages SET processed = 1 WHERE id IN ({placeholders})");
            let changed = conn.execute(&sql, rusqlite::params_from_iter(ids.iter()))?;
            Ok(changed)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch the most recent `limit` messages for one conversation, returned in
/// ascending timestamp order (ready for prompt rendering).
pub async fn recent_history(
    db: &Database,
    conversation: ConversationId,
    limit: i64,
) -> Result<Vec<StoredMessage>, EarshotError> {
    let group_id = conversation.as_group();
    db.connection()
        .call(move |conn| {
            let mut messages = Vec::new();
            match group_id {
                Some(gid) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages
                         WHERE group_id = ?1
                         ORDER BY timestamp DESC
                         LIMIT ?2"
                    ))?;
                    let rows = stmt.query_map(params![gid, limit], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages
                         WHERE group_id IS NULL
                         ORDER BY timestamp DESC
                         LIMIT ?1"
                    ))?;
                    let rows = stmt.query_map(params![limit], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_msg(source_id: i64, group: i64, text: &str, timestamp: i64) -> NewMessage {
        NewMessage {
            source_message_id: source_id,
            conversation: ConversationId::Group(group),
            sender_id: 1000,
            sender_nickname: Some("alice".into()),
            sender_is_privileged: false,
            text: text.to_string(),
            raw_payload: "{}".to_string(),
            timestamp,
            is_admin_message: false,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_unprocessed_in_timestamp_order() {
        let (db, _dir) = setup_db().await;

        // Inserted out of order; fetch must sort by timestamp.
        insert_message(&db, &make_msg(3, 100, "third", 30)).await.unwrap();
        insert_message(&db, &make_msg(1, 100, "first", 10)).await.unwrap();
        insert_message(&db, &make_msg(2, 100, "second", 20)).await.unwrap();

        let messages = unprocessed(&db, 50).await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].text, "first");
        assert_eq!(messages[1].text, "second");
        assert_eq!(messages[2].text, "third");
        assert!(messages.iter().all(|m| !m.processed));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unprocessed_respects_limit() {
        let (db, _dir) = setup_db().await;
        for i in 0..10 {
            insert_message(&db, &make_msg(i, 100, "m", i)).await.unwrap();
        }
        let messages = unprocessed(&db, 4).await.unwrap();
        assert_eq!(messages.len(), 4);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_processed_excludes_from_backlog() {
        let (db, _dir) = setup_db().await;
        let id1 = insert_message(&db, &make_msg(1, 100, "a", 1)).await.unwrap();
        let _id2 = insert_message(&db, &make_msg(2, 100, "b", 2)).await.unwrap();

        let changed = mark_processed(&db, &[id1]).await.unwrap();
        assert_eq!(changed, 1);

        let remaining = unprocessed(&db, 50).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].text, "b");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_processed_empty_slice_is_noop() {
        let (db, _dir) = setup_db().await;
        assert_eq!(mark_processed(&db, &[]).await.unwrap(), 0);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn recent_history_scopes_to_conversation_and_orders_ascending() {
        let (db, _dir) = setup_db().await;
        for i in 0..5 {
            insert_message(&db, &make_msg(i, 100, &format!("g100-{i}"), i)).await.unwrap();
        }
        insert_message(&db, &make_msg(99, 200, "other group", 3)).await.unwrap();

        let history = recent_history(&db, ConversationId::Group(100), 3).await.unwrap();
        assert_eq!(history.len(), 3);
        // Most recent three, ascending.
        assert_eq!(history[0].text, "g100-2");
        assert_eq!(history[2].text, "g100-4");

        let none = recent_history(&db, ConversationId::Private, 10).await.unwrap();
        assert!(none.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn private_messages_round_trip_null_group() {
        let (db, _dir) = setup_db().await;
        let msg = NewMessage {
            conversation: ConversationId::Private,
            is_admin_message: true,
            ..make_msg(7, 0, "private note", 1)
        };
        insert_message(&db, &msg).await.unwrap();

        let history = recent_history(&db, ConversationId::Private, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].conversation, ConversationId::Private);
        assert!(history[0].is_admin_message);

        db.close().await.unwrap();
    }
}
