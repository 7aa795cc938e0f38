// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Analysis-task bookkeeping: one row per batcher pass.

use std::str::FromStr;

use earshot_core::types::{AnalysisTask, TaskStatus};
use earshot_core::EarshotError;
use rusqlite::params;

use crate::database::Database;

/// Record or update a pass row.
///
/// Upsert keyed by `task_id`: the first write fixes `started_at`, a terminal
/// status (`completed`/`failed`) stamps `completed_at`.
pub async fn record_task(db: &Database, task: &AnalysisTask) -> Result<(), EarshotError> {
    let task = task.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO analysis_tasks (
                    task_id, status, message_count, events_found, error_message,
                    started_at, completed_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5,
                    COALESCE(
                        (SELECT started_at FROM analysis_tasks WHERE task_id = ?1),
                        strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                    ),
                    CASE WHEN ?2 IN ('completed', 'failed')
                         THEN strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         ELSE NULL END
                 )",
                params![
                    task.task_id,
                    task.status.to_string(),
                    task.message_count,
                    task.events_found,
                    task.error,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a pass row by task id.
pub async fn find_task(db: &Database, task_id: &str) -> Result<Option<AnalysisTask>, EarshotError> {
    let task_id = task_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT task_id, status, message_count, events_found, error_message
                 FROM analysis_tasks WHERE task_id = ?1",
            )?;
            let mut rows = stmt.query_map(params![task_id], |row| {
                let status: String = row.get(1)?;
                Ok(AnalysisTask {
                    task_id: row.get(0)?,
                    status: TaskStatus::from_str(&status).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            1,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
                    message_count: row.get(2)?,
                    events_found: row.get(3)?,
                    error: row.get(4)?,
                })
            })?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
