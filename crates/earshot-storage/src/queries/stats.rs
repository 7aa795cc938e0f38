// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named scalar stats (counters and timestamps exposed for observability).

use std::collections::HashMap;

use earshot_core::EarshotError;
use rusqlite::params;

use crate::database::Database;

/// Upsert one named stat.
pub async fn upsert_stat(db: &Database, name: &str, value: &str) -> Result<(), EarshotError> {
    let name = name.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO system_stats (stat_name, stat_value, updated_at)
                 VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT(stat_name) DO UPDATE SET
                     stat_value = excluded.stat_value,
                     updated_at = excluded.updated_at",
                params![name, value],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Read all named stats.
pub async fn get_stats(db: &Database) -> Result<HashMap<String, String>, EarshotError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT stat_name, stat_value FROM system_stats")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut stats = HashMap::new();
            for row in rows {
                let (name, value) = row?;
                stats.insert(name, value);
            }
            Ok(stats)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn upsert_overwrites_previous_value() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        upsert_stat(&db, "total_messages_received", "1").await.unwrap();
        upsert_stat(&db, "total_messages_received", "2").await.unwrap();
        upsert_stat(&db, "last_analysis_time", "2026-03-01T12:00:00+08:00")
            .await
            .unwrap();

        let stats = get_stats(&db).await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["total_messages_received"], "2");
        assert_eq!(stats["last_analysis_time"], "2026-03-01T12:00:00+08:00");

        db.close().await.unwrap();
    }
}
