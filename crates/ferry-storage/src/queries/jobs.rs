// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job record queries.

use ferry_core::entity::JobEntity;
use ferry_core::{AuthorizationState, FerryError, JobId, PortabilityJob};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Insert a job. Returns `false` if a row with the same id already exists.
pub async fn insert_job(db: &Database, id: JobId, job: &PortabilityJob) -> Result<bool, FerryError> {
    let entity = job.to_entity().to_json()?;
    let id = id.to_string();
    let auth_state = job.auth_state().to_string();
    let job_state = job.state.to_string();
    let created_at = job.created_at.to_rfc3339();
    let updated_at = job.updated_at.to_rfc3339();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO jobs (id, auth_state, job_state, entity, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, auth_state, job_state, entity, created_at, updated_at],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite a job in one statement, guarded by the stored authorization state.
///
/// Returns the number of rows changed: zero means the row is missing or the
/// guard did not match.
pub async fn update_job(
    db: &Database,
    id: JobId,
    job: &PortabilityJob,
    expected: Option<AuthorizationState>,
) -> Result<usize, FerryError> {
    let entity = job.to_entity().to_json()?;
    let id = id.to_string();
    let auth_state = job.auth_state().to_string();
    let job_state = job.state.to_string();
    let updated_at = job.updated_at.to_rfc3339();
    let expected = expected.map(|s| s.to_string());
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE jobs SET auth_state = ?2, job_state = ?3, entity = ?4, updated_at = ?5
                 WHERE id = ?1 AND (?6 IS NULL OR auth_state = ?6)",
                params![id, auth_state, job_state, entity, updated_at, expected],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch and decode one job.
pub async fn get_job(db: &Database, id: JobId) -> Result<Option<PortabilityJob>, FerryError> {
    let key = id.to_string();
    let entity = db
        .connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT entity FROM jobs WHERE id = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    entity
        .map(|json| PortabilityJob::from_entity(&JobEntity::from_json(&json)?))
        .transpose()
}

/// Current authorization state of a job, without decoding the full record.
pub async fn get_auth_state(
    db: &Database,
    id: JobId,
) -> Result<Option<AuthorizationState>, FerryError> {
    let key = id.to_string();
    let raw = db
        .connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT auth_state FROM jobs WHERE id = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    raw.map(|s| {
        s.parse()
            .map_err(|_| FerryError::storage(format!("unknown authorization state `{s}`")))
    })
    .transpose()
}

/// Any one job in `state`. SQLite returns whichever row it reaches first.
pub async fn find_first_in_state(
    db: &Database,
    state: AuthorizationState,
) -> Result<Option<JobId>, FerryError> {
    let state = state.to_string();
    let raw = db
        .connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT id FROM jobs WHERE auth_state = ?1 LIMIT 1",
                params![state],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    raw.map(|s| {
        s.parse::<JobId>()
            .map_err(|e| FerryError::storage(format!("corrupt job id `{s}`: {e}")))
    })
    .transpose()
}

/// Delete a job and every row stored under it. Returns `false` if no job existed.
pub async fn delete_job(db: &Database, id: JobId) -> Result<bool, FerryError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let removed = tx.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
            for table in [
                "job_errors",
                "job_counts",
                "job_blobs",
                "job_stacks",
                "idempotent_results",
            ] {
                tx.execute(&format!("DELETE FROM {table} WHERE job_id = ?1"), params![id])?;
            }
            tx.commit()?;
            Ok(removed == 1)
        })
        .await
        .map_err(map_tr_err)
}
