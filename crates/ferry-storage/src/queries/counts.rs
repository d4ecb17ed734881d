// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running per-item-type import counters.

use std::collections::BTreeMap;

use ferry_core::{FerryError, JobId};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Add `counts` to the stored totals.
pub async fn add_counts(
    db: &Database,
    id: JobId,
    counts: &BTreeMap<String, i64>,
) -> Result<(), FerryError> {
    if counts.is_empty() {
        return Ok(());
    }
    let id = id.to_string();
    let counts = counts.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO job_counts (job_id, item_type, count) VALUES (?1, ?2, ?3)
                     ON CONFLICT(job_id, item_type) DO UPDATE SET count = count + excluded.count",
                )?;
                for (item_type, count) in &counts {
                    stmt.execute(params![id, item_type, count])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_counts(db: &Database, id: JobId) -> Result<BTreeMap<String, i64>, FerryError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<BTreeMap<String, i64>, rusqlite::Error> {
            let mut stmt =
                conn.prepare("SELECT item_type, count FROM job_counts WHERE job_id = ?1")?;
            let rows = stmt.query_map(params![id], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    #[tokio::test]
    async fn counts_accumulate() {
        let (db, _dir) = setup_db().await;
        let id = JobId::new();
        let batch = BTreeMap::from([("PHOTOS".to_string(), 3), ("ALBUMS".to_string(), 1)]);
        add_counts(&db, id, &batch).await.unwrap();
        add_counts(&db, id, &BTreeMap::from([("PHOTOS".to_string(), 2)]))
            .await
            .unwrap();

        let totals = get_counts(&db, id).await.unwrap();
        assert_eq!(totals["PHOTOS"], 5);
        assert_eq!(totals["ALBUMS"], 1);
        db.close().await.unwrap();
    }
}
