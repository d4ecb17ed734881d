// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cached successes of the idempotent executor.

use std::collections::HashMap;

use ferry_core::{FerryError, JobId};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

pub async fn load_results(db: &Database, id: JobId) -> Result<HashMap<String, String>, FerryError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<HashMap<String, String>, rusqlite::Error> {
            let mut stmt =
                conn.prepare("SELECT key, value FROM idempotent_results WHERE job_id = ?1")?;
            let rows = stmt.query_map(params![id], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Record a success. The first value stored for a key wins.
pub async fn put_result(db: &Database, id: JobId, key: &str, value: &str) -> Result<(), FerryError> {
    let id = id.to_string();
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT OR IGNORE INTO idempotent_results (job_id, key, value) VALUES (?1, ?2, ?3)",
                params![id, key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    #[tokio::test]
    async fn first_result_wins() {
        let (db, _dir) = setup_db().await;
        let id = JobId::new();
        put_result(&db, id, "album-1", "\"dest-1\"").await.unwrap();
        put_result(&db, id, "album-1", "\"dest-2\"").await.unwrap();
        put_result(&db, id, "root-p1", "null").await.unwrap();

        let results = load_results(&db, id).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results["album-1"], "\"dest-1\"");
        assert!(load_results(&db, JobId::new()).await.unwrap().is_empty());
        db.close().await.unwrap();
    }
}
