// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ferry create-job`, `show-job`, and `delete-job`.

use std::sync::Arc;

use ferry_config::FerryConfig;
use ferry_core::{DataVertical, FerryError, JobId};
use ferry_gateway::{AuthServiceRegistry, JobManager};
use ferry_storage::SqliteJobStore;

async fn open_manager(config: &FerryConfig) -> Result<(JobManager, Arc<SqliteJobStore>), FerryError> {
    let store = Arc::new(SqliteJobStore::open(config.storage.clone()).await?);
    let manager = JobManager::new(
        store.clone(),
        Arc::new(AuthServiceRegistry::new()),
        config.gateway.callback_base_url.clone(),
    );
    Ok((manager, store))
}

fn parse_job_id(raw: &str) -> Result<JobId, FerryError> {
    raw.parse()
        .map_err(|e| FerryError::Config(format!("invalid job id `{raw}`: {e}")))
}

pub async fn create_job(
    config: &FerryConfig,
    data_type: DataVertical,
    export: &str,
    import: &str,
) -> Result<(), FerryError> {
    let (manager, store) = open_manager(config).await?;
    let job_id = manager.create_job(data_type, export, import, None).await?;
    store.close().await?;
    println!("{job_id}");
    Ok(())
}

pub async fn show_job(config: &FerryConfig, raw_id: &str) -> Result<(), FerryError> {
    let job_id = parse_job_id(raw_id)?;
    let (manager, _store) = open_manager(config).await?;
    let status = manager.job_status(job_id).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

pub async fn delete_job(config: &FerryConfig, raw_id: &str) -> Result<(), FerryError> {
    let job_id = parse_job_id(raw_id)?;
    let (manager, store) = open_manager(config).await?;
    manager.delete_job(job_id).await?;
    store.close().await?;
    println!("deleted {job_id}");
    Ok(())
}
