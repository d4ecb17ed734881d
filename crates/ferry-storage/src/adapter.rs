// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the JobStore trait.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use ferry_config::model::StorageConfig;
use ferry_core::models::{ErrorDetail, ExportInformation};
use ferry_core::{
    AdapterType, AuthorizationState, FerryError, HealthStatus, IdempotentStore, JobId, JobStore,
    PluginAdapter, PortabilityJob,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed job store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened by [`SqliteJobStore::initialize`].
pub struct SqliteJobStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteJobStore {
    /// Create a store for the configured path without opening it.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Create and initialize in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, FerryError> {
        let store = Self::new(config);
        store.initialize().await?;
        Ok(store)
    }

    /// Open the database and run migrations.
    pub async fn initialize(&self) -> Result<(), FerryError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| FerryError::storage("job store already initialized"))?;
        debug!(path = %self.config.database_path, "SQLite job store initialized");
        Ok(())
    }

    /// Checkpoint the WAL. The connection closes when the store is dropped.
    pub async fn close(&self) -> Result<(), FerryError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    fn db(&self) -> Result<&Database, FerryError> {
        self.db
            .get()
            .ok_or_else(|| FerryError::storage("job store not initialized -- call initialize() first"))
    }
}

#[async_trait]
impl PluginAdapter for SqliteJobStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::JobStore
    }

    async fn health_check(&self) -> Result<HealthStatus, FerryError> {
        let db = match self.db() {
            Ok(db) => db,
            Err(e) => return Ok(HealthStatus::Unhealthy(e.to_string())),
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create_job(&self, id: JobId, job: &PortabilityJob) -> Result<(), FerryError> {
        if !queries::jobs::insert_job(self.db()?, id, job).await? {
            return Err(FerryError::inconsistent(id, "job already exists"));
        }
        debug!(job_id = %id, vertical = %job.data_vertical, "job created");
        Ok(())
    }

    async fn update_job(
        &self,
        id: JobId,
        job: &PortabilityJob,
        expected: Option<AuthorizationState>,
    ) -> Result<(), FerryError> {
        let db = self.db()?;
        if queries::jobs::update_job(db, id, job, expected).await? == 1 {
            return Ok(());
        }
        // Nothing changed: report why for the caller's logs.
        match (queries::jobs::get_auth_state(db, id).await?, expected) {
            (None, _) => Err(FerryError::inconsistent(id, "job not found")),
            (Some(found), Some(expected)) => Err(FerryError::inconsistent(
                id,
                format!("expected authorization state {expected}, found {found}"),
            )),
            (Some(_), None) => Err(FerryError::inconsistent(id, "update matched no rows")),
        }
    }

    async fn find_job(&self, id: JobId) -> Result<Option<PortabilityJob>, FerryError> {
        queries::jobs::get_job(self.db()?, id).await
    }

    async fn find_first_job_in_state(
        &self,
        state: AuthorizationState,
    ) -> Result<Option<JobId>, FerryError> {
        queries::jobs::find_first_in_state(self.db()?, state).await
    }

    async fn remove(&self, id: JobId) -> Result<(), FerryError> {
        if !queries::jobs::delete_job(self.db()?, id).await? {
            return Err(FerryError::inconsistent(id, "job not found"));
        }
        debug!(job_id = %id, "job removed");
        Ok(())
    }

    async fn add_errors_to_job(&self, id: JobId, errors: &[ErrorDetail]) -> Result<(), FerryError> {
        queries::errors::insert_errors(self.db()?, id, errors).await
    }

    async fn errors_for_job(&self, id: JobId) -> Result<Vec<ErrorDetail>, FerryError> {
        queries::errors::list_errors(self.db()?, id).await
    }

    async fn add_counts(&self, id: JobId, counts: &BTreeMap<String, i64>) -> Result<(), FerryError> {
        queries::counts::add_counts(self.db()?, id, counts).await
    }

    async fn counts_for_job(&self, id: JobId) -> Result<BTreeMap<String, i64>, FerryError> {
        queries::counts::get_counts(self.db()?, id).await
    }

    async fn store_job_stack(&self, id: JobId, stack: &[ExportInformation]) -> Result<(), FerryError> {
        queries::stacks::store_stack(self.db()?, id, stack).await
    }

    async fn load_job_stack(&self, id: JobId) -> Result<Option<Vec<ExportInformation>>, FerryError> {
        queries::stacks::load_stack(self.db()?, id).await
    }

    async fn clear_job_stack(&self, id: JobId) -> Result<(), FerryError> {
        queries::stacks::clear_stack(self.db()?, id).await
    }

    async fn create_blob(&self, id: JobId, key: &str, data: Vec<u8>) -> Result<(), FerryError> {
        queries::blobs::put_blob(self.db()?, id, key, data).await
    }

    async fn get_blob(&self, id: JobId, key: &str) -> Result<Option<Vec<u8>>, FerryError> {
        queries::blobs::get_blob(self.db()?, id, key).await
    }
}

#[async_trait]
impl IdempotentStore for SqliteJobStore {
    async fn load_results(&self, id: JobId) -> Result<HashMap<String, String>, FerryError> {
        queries::idempotent::load_results(self.db()?, id).await
    }

    async fn put_result(&self, id: JobId, key: &str, value: &str) -> Result<(), FerryError> {
        queries::idempotent::put_result(self.db()?, id, key, value).await
    }
}
