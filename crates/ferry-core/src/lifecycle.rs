// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compare-and-swap helpers over [`JobStore`].
//!
//! Each helper reads the current record, checks it against the caller's
//! expectation, applies a mutation, and writes it back with the expected
//! authorization state as the store-side guard. A lost race surfaces as
//! [`FerryError::InconsistentJobState`] and must not be retried blindly.

use chrono::Utc;
use tracing::debug;

use crate::error::FerryError;
use crate::job::{AuthorizationState, PortabilityJob};
use crate::traits::JobStore;
use crate::types::JobId;

/// Load a job, treating absence as an inconsistent state.
pub async fn require_job(store: &dyn JobStore, id: JobId) -> Result<PortabilityJob, FerryError> {
    store
        .find_job(id)
        .await?
        .ok_or_else(|| FerryError::inconsistent(id, "job not found"))
}

/// Move the job's authorization from `from` to `to`, applying `mutate` first.
pub async fn transition_authorization<F>(
    store: &dyn JobStore,
    id: JobId,
    from: AuthorizationState,
    to: AuthorizationState,
    mutate: F,
) -> Result<PortabilityJob, FerryError>
where
    F: FnOnce(&mut PortabilityJob),
{
    if !from.can_transition_to(to) {
        return Err(FerryError::inconsistent(
            id,
            format!("illegal authorization transition {from} -> {to}"),
        ));
    }
    let job = update_guarded(store, id, from, |job| {
        mutate(job);
        job.authorization.state = Some(to);
    })
    .await?;
    debug!(job_id = %id, %from, %to, "authorization state advanced");
    Ok(job)
}

/// Apply `mutate` to a job whose authorization state must currently be `expected`.
///
/// The mutation may not change the authorization state unless called through
/// [`transition_authorization`].
pub async fn update_guarded<F>(
    store: &dyn JobStore,
    id: JobId,
    expected: AuthorizationState,
    mutate: F,
) -> Result<PortabilityJob, FerryError>
where
    F: FnOnce(&mut PortabilityJob),
{
    let mut job = require_job(store, id).await?;
    let current = job.auth_state();
    if current != expected {
        return Err(FerryError::inconsistent(
            id,
            format!("expected authorization state {expected}, found {current}"),
        ));
    }
    mutate(&mut job);
    job.updated_at = Utc::now();
    job.authorization.validate(id)?;
    store.update_job(id, &job, Some(expected)).await?;
    Ok(job)
}
