// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-job error list.

use ferry_core::models::ErrorDetail;
use ferry_core::{FerryError, JobId};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Append a batch of errors in one transaction.
pub async fn insert_errors(
    db: &Database,
    id: JobId,
    errors: &[ErrorDetail],
) -> Result<(), FerryError> {
    if errors.is_empty() {
        return Ok(());
    }
    let id = id.to_string();
    let encoded = errors
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            {
                let mut stmt =
                    tx.prepare("INSERT INTO job_errors (job_id, detail) VALUES (?1, ?2)")?;
                for detail in &encoded {
                    stmt.execute(params![id, detail])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// All recorded errors for a job in insertion order.
pub async fn list_errors(db: &Database, id: JobId) -> Result<Vec<ErrorDetail>, FerryError> {
    let id = id.to_string();
    let rows = db
        .connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt =
                conn.prepare("SELECT detail FROM job_errors WHERE job_id = ?1 ORDER BY id")?;
            let rows = stmt.query_map(params![id], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;
    rows.iter()
        .map(|json| serde_json::from_str(json).map_err(FerryError::from))
        .collect()
}
