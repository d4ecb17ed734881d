// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-job scratch blobs keyed by name.

use ferry_core::{FerryError, JobId};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Write a blob, replacing any previous value under the same key.
pub async fn put_blob(db: &Database, id: JobId, key: &str, data: Vec<u8>) -> Result<(), FerryError> {
    let id = id.to_string();
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO job_blobs (job_id, key, data) VALUES (?1, ?2, ?3)
                 ON CONFLICT(job_id, key) DO UPDATE SET data = excluded.data",
                params![id, key, data],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_blob(db: &Database, id: JobId, key: &str) -> Result<Option<Vec<u8>>, FerryError> {
    let id = id.to_string();
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Vec<u8>>, rusqlite::Error> {
            conn.query_row(
                "SELECT data FROM job_blobs WHERE job_id = ?1 AND key = ?2",
                params![id, key],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    #[tokio::test]
    async fn blob_overwrites_and_isolates_jobs() {
        let (db, _dir) = setup_db().await;
        let a = JobId::new();
        let b = JobId::new();
        put_blob(&db, a, "index", b"one".to_vec()).await.unwrap();
        put_blob(&db, a, "index", b"two".to_vec()).await.unwrap();

        assert_eq!(get_blob(&db, a, "index").await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(get_blob(&db, b, "index").await.unwrap(), None);
        assert_eq!(get_blob(&db, a, "other").await.unwrap(), None);
        db.close().await.unwrap();
    }
}
