// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness helpers.

use earshot_storage::Database;
use tempfile::TempDir;

/// A migrated scratch database in a temp dir that lives as long as the value.
pub struct TestDb {
    pub db: Database,
    _dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("earshot-test.db");
        let db = Database::open(path.to_str().expect("utf8 path"))
            .await
            .expect("open test db");
        Self { db, _dir: dir }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_db_opens_and_closes() {
        let harness = TestDb::new().await;
        harness.db.close().await.unwrap();
    }
}
