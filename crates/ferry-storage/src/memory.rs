// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process job store for tests and single-process runs.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use ferry_core::models::{ErrorDetail, ExportInformation};
use ferry_core::{
    AdapterType, AuthorizationState, FerryError, IdempotentStore, JobId, JobStore,
    PluginAdapter, PortabilityJob,
};

#[derive(Default)]
struct Tables {
    jobs: HashMap<JobId, PortabilityJob>,
    errors: HashMap<JobId, Vec<ErrorDetail>>,
    counts: HashMap<JobId, BTreeMap<String, i64>>,
    stacks: HashMap<JobId, Vec<ExportInformation>>,
    blobs: HashMap<(JobId, String), Vec<u8>>,
    results: HashMap<JobId, HashMap<String, String>>,
}

/// Job store backed by maps behind a single async mutex.
///
/// The conditional update runs under the lock, so it has the same
/// single-winner semantics as the SQLite store.
#[derive(Default)]
pub struct MemoryJobStore {
    tables: Mutex<Tables>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginAdapter for MemoryJobStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::JobStore
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, id: JobId, job: &PortabilityJob) -> Result<(), FerryError> {
        let mut tables = self.tables.lock().await;
        if tables.jobs.contains_key(&id) {
            return Err(FerryError::inconsistent(id, "job already exists"));
        }
        tables.jobs.insert(id, job.clone());
        Ok(())
    }

    async fn update_job(
        &self,
        id: JobId,
        job: &PortabilityJob,
        expected: Option<AuthorizationState>,
    ) -> Result<(), FerryError> {
        let mut tables = self.tables.lock().await;
        let current = tables
            .jobs
            .get_mut(&id)
            .ok_or_else(|| FerryError::inconsistent(id, "job not found"))?;
        if let Some(expected) = expected {
            let found = current.auth_state();
            if found != expected {
                return Err(FerryError::inconsistent(
                    id,
                    format!("expected authorization state {expected}, found {found}"),
                ));
            }
        }
        *current = job.clone();
        Ok(())
    }

    async fn find_job(&self, id: JobId) -> Result<Option<PortabilityJob>, FerryError> {
        Ok(self.tables.lock().await.jobs.get(&id).cloned())
    }

    async fn find_first_job_in_state(
        &self,
        state: AuthorizationState,
    ) -> Result<Option<JobId>, FerryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .jobs
            .iter()
            .find(|(_, job)| job.auth_state() == state)
            .map(|(id, _)| *id))
    }

    async fn remove(&self, id: JobId) -> Result<(), FerryError> {
        let mut tables = self.tables.lock().await;
        if tables.jobs.remove(&id).is_none() {
            return Err(FerryError::inconsistent(id, "job not found"));
        }
        tables.errors.remove(&id);
        tables.counts.remove(&id);
        tables.stacks.remove(&id);
        tables.results.remove(&id);
        tables.blobs.retain(|(job, _), _| *job != id);
        Ok(())
    }

    async fn add_errors_to_job(&self, id: JobId, errors: &[ErrorDetail]) -> Result<(), FerryError> {
        if errors.is_empty() {
            return Ok(());
        }
        let mut tables = self.tables.lock().await;
        tables
            .errors
            .entry(id)
            .or_default()
            .extend_from_slice(errors);
        Ok(())
    }

    async fn errors_for_job(&self, id: JobId) -> Result<Vec<ErrorDetail>, FerryError> {
        let tables = self.tables.lock().await;
        Ok(tables.errors.get(&id).cloned().unwrap_or_default())
    }

    async fn add_counts(&self, id: JobId, counts: &BTreeMap<String, i64>) -> Result<(), FerryError> {
        let mut tables = self.tables.lock().await;
        let totals = tables.counts.entry(id).or_default();
        for (item_type, count) in counts {
            *totals.entry(item_type.clone()).or_insert(0) += count;
        }
        Ok(())
    }

    async fn counts_for_job(&self, id: JobId) -> Result<BTreeMap<String, i64>, FerryError> {
        let tables = self.tables.lock().await;
        Ok(tables.counts.get(&id).cloned().unwrap_or_default())
    }

    async fn store_job_stack(&self, id: JobId, stack: &[ExportInformation]) -> Result<(), FerryError> {
        self.tables.lock().await.stacks.insert(id, stack.to_vec());
        Ok(())
    }

    async fn load_job_stack(&self, id: JobId) -> Result<Option<Vec<ExportInformation>>, FerryError> {
        Ok(self.tables.lock().await.stacks.get(&id).cloned())
    }

    async fn clear_job_stack(&self, id: JobId) -> Result<(), FerryError> {
        self.tables.lock().await.stacks.remove(&id);
        Ok(())
    }

    async fn create_blob(&self, id: JobId, key: &str, data: Vec<u8>) -> Result<(), FerryError> {
        self.tables
            .lock()
            .await
            .blobs
            .insert((id, key.to_string()), data);
        Ok(())
    }

    async fn get_blob(&self, id: JobId, key: &str) -> Result<Option<Vec<u8>>, FerryError> {
        let tables = self.tables.lock().await;
        Ok(tables.blobs.get(&(id, key.to_string())).cloned())
    }
}

#[async_trait]
impl IdempotentStore for MemoryJobStore {
    async fn load_results(&self, id: JobId) -> Result<HashMap<String, String>, FerryError> {
        let tables = self.tables.lock().await;
        Ok(tables.results.get(&id).cloned().unwrap_or_default())
    }

    async fn put_result(&self, id: JobId, key: &str, value: &str) -> Result<(), FerryError> {
        let mut tables = self.tables.lock().await;
        tables
            .results
            .entry(id)
            .or_default()
            .entry(key.to_string())
            .or_insert_with(|| value.to_string());
        Ok(())
    }
}
