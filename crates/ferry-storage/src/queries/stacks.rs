// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted pending-work stack of the transfer driver loop.

use ferry_core::models::ExportInformation;
use ferry_core::{FerryError, JobId};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

pub async fn store_stack(
    db: &Database,
    id: JobId,
    stack: &[ExportInformation],
) -> Result<(), FerryError> {
    let id = id.to_string();
    let encoded = serde_json::to_string(stack)?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO job_stacks (job_id, stack) VALUES (?1, ?2)
                 ON CONFLICT(job_id) DO UPDATE SET stack = excluded.stack",
                params![id, encoded],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn load_stack(
    db: &Database,
    id: JobId,
) -> Result<Option<Vec<ExportInformation>>, FerryError> {
    let id = id.to_string();
    let raw = db
        .connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT stack FROM job_stacks WHERE job_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    raw.map(|json| serde_json::from_str(&json).map_err(FerryError::from))
        .transpose()
}

pub async fn clear_stack(db: &Database, id: JobId) -> Result<(), FerryError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM job_stacks WHERE job_id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;
    use ferry_core::models::{ContainerResource, PaginationToken};

    #[tokio::test]
    async fn stack_replaces_and_clears() {
        let (db, _dir) = setup_db().await;
        let id = JobId::new();
        assert!(load_stack(&db, id).await.unwrap().is_none());

        let first = vec![ExportInformation::container(ContainerResource::id_only("a1"))];
        store_stack(&db, id, &first).await.unwrap();
        let second = vec![
            ExportInformation::container(ContainerResource::id_only("a2")),
            ExportInformation::page(PaginationToken::new("album:p2"), None),
        ];
        store_stack(&db, id, &second).await.unwrap();
        assert_eq!(load_stack(&db, id).await.unwrap(), Some(second));

        clear_stack(&db, id).await.unwrap();
        assert!(load_stack(&db, id).await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
