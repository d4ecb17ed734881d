// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job store contract: the only shared mutable resource across tiers.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;

use crate::error::FerryError;
use crate::job::{AuthorizationState, PortabilityJob};
use crate::models::{ErrorDetail, ExportInformation};
use crate::traits::adapter::PluginAdapter;
use crate::types::JobId;

/// Persistent store of job records, their error lists, and scratch blobs.
///
/// Every mutation of a job record goes through [`JobStore::update_job`], which
/// is a single conditional write; there is no other locking.
#[async_trait]
pub trait JobStore: PluginAdapter {
    /// Insert a new job. Fails if a record already exists for `id`.
    async fn create_job(&self, id: JobId, job: &PortabilityJob) -> Result<(), FerryError>;

    /// Replace the record for `id`.
    ///
    /// Fails with [`FerryError::InconsistentJobState`] if no record exists or,
    /// when `expected` is given, the stored authorization state differs.
    async fn update_job(
        &self,
        id: JobId,
        job: &PortabilityJob,
        expected: Option<AuthorizationState>,
    ) -> Result<(), FerryError>;

    async fn find_job(&self, id: JobId) -> Result<Option<PortabilityJob>, FerryError>;

    /// Any one job currently in `state`. No ordering is guaranteed.
    async fn find_first_job_in_state(
        &self,
        state: AuthorizationState,
    ) -> Result<Option<JobId>, FerryError>;

    /// Delete a job and everything stored under it. Fails if it does not exist.
    async fn remove(&self, id: JobId) -> Result<(), FerryError>;

    /// Append errors to the job's error list in one write.
    async fn add_errors_to_job(&self, id: JobId, errors: &[ErrorDetail]) -> Result<(), FerryError>;

    async fn errors_for_job(&self, id: JobId) -> Result<Vec<ErrorDetail>, FerryError>;

    /// Add per-item-type import counts to the job's running totals.
    async fn add_counts(&self, id: JobId, counts: &BTreeMap<String, i64>) -> Result<(), FerryError>;

    async fn counts_for_job(&self, id: JobId) -> Result<BTreeMap<String, i64>, FerryError>;

    /// Persist the driver loop's pending work, replacing any previous copy.
    async fn store_job_stack(&self, id: JobId, stack: &[ExportInformation]) -> Result<(), FerryError>;

    async fn load_job_stack(&self, id: JobId) -> Result<Option<Vec<ExportInformation>>, FerryError>;

    async fn clear_job_stack(&self, id: JobId) -> Result<(), FerryError>;

    /// Write (or overwrite) a scratch blob for `(id, key)`.
    async fn create_blob(&self, id: JobId, key: &str, data: Vec<u8>) -> Result<(), FerryError>;

    async fn get_blob(&self, id: JobId, key: &str) -> Result<Option<Vec<u8>>, FerryError>;
}

/// Durable backing for the idempotent executor's success cache.
#[async_trait]
pub trait IdempotentStore: Send + Sync {
    /// All cached results for `id`, keyed by idempotent key, as JSON strings.
    async fn load_results(&self, id: JobId) -> Result<HashMap<String, String>, FerryError>;

    async fn put_result(&self, id: JobId, key: &str, value: &str) -> Result<(), FerryError>;
}
