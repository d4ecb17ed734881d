// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ferry worker` command implementation.

use std::sync::Arc;

use ferry_config::FerryConfig;
use ferry_core::FerryError;
use ferry_storage::SqliteJobStore;
use ferry_transfer::ExtensionRegistry;
use ferry_worker::{Worker, install_signal_handler};
use tracing::{info, warn};

/// Run the worker loop until SIGTERM or Ctrl+C.
pub async fn run_worker(config: &FerryConfig) -> Result<(), FerryError> {
    let store = Arc::new(SqliteJobStore::open(config.storage.clone()).await?);
    let registry = Arc::new(ExtensionRegistry::new());
    if registry.is_empty() {
        warn!("no provider extensions are compiled in; claimed jobs will fail");
    }

    let worker = Worker::from_config(config, store.clone(), store.clone(), registry);
    info!(
        instance_id = worker.instance_id(),
        database = %config.storage.database_path,
        "starting transfer worker"
    );

    let cancel = install_signal_handler();
    worker.run(cancel).await;

    store.close().await?;
    info!("worker shut down cleanly");
    Ok(())
}
