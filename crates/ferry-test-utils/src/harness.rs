// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end transfers.
//!
//! `TestHarness` assembles a temp SQLite job store, a front-end
//! [`JobManager`], and a [`Worker`] sharing one [`ExtensionRegistry`]. The
//! `TASKS` vertical runs the item fixtures; `PHOTOS` runs the album/media
//! exporter and importer over in-memory providers.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use ferry_config::model::StorageConfig;
use ferry_config::FerryConfig;
use ferry_core::{AuthData, AuthMode, DataVertical, FerryError, JobId, JobState};
use ferry_gateway::{AuthServiceRegistry, JobManager};
use ferry_storage::SqliteJobStore;
use ferry_transfer::media::{AlbumMediaExporter, AlbumMediaImporter};
use ferry_transfer::{Exporter, ExtensionRegistry, Importer};
use ferry_worker::{JobPoller, JobProcessor, Worker};

use crate::fixtures::{FixtureExporter, FixtureImporter, StaticAuthGenerator};
use crate::media::{MemoryMediaDestination, MemoryMediaLibrary};

/// Export service name registered by the harness.
pub const SOURCE: &str = "fixture-source";
/// Import service name registered by the harness.
pub const DEST: &str = "fixture-dest";

const TEST_KEY_BITS: usize = 1024;
const POLL: Duration = Duration::from_millis(10);

/// Builder for creating test environments with configurable fixtures.
pub struct TestHarnessBuilder {
    pages: Vec<Vec<String>>,
    rejected_items: Vec<String>,
    library: MemoryMediaLibrary,
    destination: MemoryMediaDestination,
    credential_timeout: Duration,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            rejected_items: Vec::new(),
            library: MemoryMediaLibrary::new(2),
            destination: MemoryMediaDestination::new(),
            credential_timeout: Duration::from_secs(5),
        }
    }

    /// Pages of item ids served by the `TASKS` exporter.
    pub fn with_pages(mut self, pages: &[&[&str]]) -> Self {
        self.pages = pages
            .iter()
            .map(|p| p.iter().map(|id| id.to_string()).collect())
            .collect();
        self
    }

    /// Item ids the `TASKS` importer fails with skippable errors.
    pub fn rejecting_items(mut self, ids: &[&str]) -> Self {
        self.rejected_items = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    /// Source library for the `PHOTOS` vertical.
    pub fn with_library(mut self, library: MemoryMediaLibrary) -> Self {
        self.library = library;
        self
    }

    /// Destination for the `PHOTOS` vertical.
    pub fn with_destination(mut self, destination: MemoryMediaDestination) -> Self {
        self.destination = destination;
        self
    }

    /// How long the worker waits for sealed credentials.
    pub fn with_credential_timeout(mut self, timeout: Duration) -> Self {
        self.credential_timeout = timeout;
        self
    }

    /// Build the harness, creating a temp database and all subsystems.
    pub async fn build(self) -> Result<TestHarness, FerryError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| FerryError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("ferry.db");

        let config = FerryConfig {
            storage: StorageConfig {
                database_path: db_path.to_string_lossy().to_string(),
                wal_mode: true,
            },
            ..FerryConfig::default()
        };
        let store = Arc::new(SqliteJobStore::open(config.storage.clone()).await?);

        let exporter = Arc::new(FixtureExporter::new(SOURCE, self.pages));
        let importer = Arc::new(FixtureImporter::new(DEST, self.rejected_items));
        let library = Arc::new(self.library);
        let destination = Arc::new(self.destination);

        let mut registry = ExtensionRegistry::new();
        {
            let exporter = exporter.clone();
            registry.register_exporter(
                SOURCE,
                DataVertical::Tasks,
                move || -> Result<Arc<dyn Exporter>, FerryError> { Ok(exporter.clone()) },
            );
            let importer = importer.clone();
            registry.register_importer(
                DEST,
                DataVertical::Tasks,
                move || -> Result<Arc<dyn Importer>, FerryError> { Ok(importer.clone()) },
            );
        }
        {
            let (library, store) = (library.clone(), store.clone());
            registry.register_exporter(
                SOURCE,
                DataVertical::Photos,
                move || -> Result<Arc<dyn Exporter>, FerryError> {
                    Ok(Arc::new(AlbumMediaExporter::new(
                        SOURCE,
                        library.clone(),
                        store.clone(),
                    )))
                },
            );
            let destination = destination.clone();
            let batch_size = config.transfer.import_batch_size;
            registry.register_importer(
                DEST,
                DataVertical::Photos,
                move || -> Result<Arc<dyn Importer>, FerryError> {
                    Ok(Arc::new(AlbumMediaImporter::new(
                        DEST,
                        destination.clone(),
                        batch_size,
                    )))
                },
            );
        }

        let mut auth = AuthServiceRegistry::new();
        for vertical in [DataVertical::Tasks, DataVertical::Photos] {
            auth.register(SOURCE, vertical, AuthMode::Export, Arc::new(StaticAuthGenerator::new(SOURCE)));
            auth.register(DEST, vertical, AuthMode::Import, Arc::new(StaticAuthGenerator::new(DEST)));
        }

        let manager = JobManager::new(
            store.clone(),
            Arc::new(auth),
            config.gateway.callback_base_url.clone(),
        );
        let poller = JobPoller::new(store.clone(), "harness-worker", TEST_KEY_BITS)
            .with_credential_wait(POLL, self.credential_timeout);
        let processor = JobProcessor::new(
            store.clone(),
            store.clone(),
            Arc::new(registry),
            config.transfer.retry.clone(),
        );
        let worker = Worker::new(poller, processor, POLL);

        Ok(TestHarness {
            store,
            manager,
            worker,
            exporter,
            importer,
            library,
            destination,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete in-process Ferry deployment over a temp database.
pub struct TestHarness {
    /// SQLite job store (temp DB, cleaned up on drop).
    pub store: Arc<SqliteJobStore>,
    /// Front-end job manager.
    pub manager: JobManager,
    /// A single worker.
    pub worker: Worker,
    /// `TASKS` exporter fixture.
    pub exporter: Arc<FixtureExporter>,
    /// `TASKS` importer fixture.
    pub importer: Arc<FixtureImporter>,
    /// `PHOTOS` source library.
    pub library: Arc<MemoryMediaLibrary>,
    /// `PHOTOS` destination.
    pub destination: Arc<MemoryMediaDestination>,
    pub config: FerryConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Create a job and run both authorization flows.
    ///
    /// Leaves the job in `CREDS_AVAILABLE` and returns the final export and
    /// import credentials the front end now holds.
    pub async fn authorize(&self, vertical: DataVertical) -> Result<(JobId, AuthData, AuthData), FerryError> {
        let job_id = self.manager.create_job(vertical, SOURCE, DEST, None).await?;
        let mut creds = Vec::with_capacity(2);
        for mode in [AuthMode::Export, AuthMode::Import] {
            self.manager.begin_authorization(job_id, mode).await?;
            let code = format!("{mode}-code");
            creds.push(
                self.manager
                    .complete_authorization(job_id, mode, &code, None)
                    .await?,
            );
        }
        self.manager.mark_credentials_available(job_id).await?;
        let import_auth = creds.pop().ok_or_else(|| FerryError::Internal("missing import auth".into()))?;
        let export_auth = creds.pop().ok_or_else(|| FerryError::Internal("missing export auth".into()))?;
        Ok((job_id, export_auth, import_auth))
    }

    /// Run one job from creation to a terminal state.
    ///
    /// The worker claims the job while the front end waits for its public
    /// key and then submits the sealed credentials.
    pub async fn run_transfer(&self, vertical: DataVertical) -> Result<(JobId, Option<JobState>), FerryError> {
        let (job_id, export_auth, import_auth) = self.authorize(vertical).await?;
        let cancel = CancellationToken::new();
        let front_end = async {
            self.manager
                .await_worker_key(job_id, POLL, Duration::from_secs(30))
                .await?;
            self.manager
                .submit_credentials(job_id, &export_auth, &import_auth)
                .await
        };
        let (state, submitted) = tokio::join!(self.worker.run_once(&cancel), front_end);
        submitted?;
        Ok((job_id, state?))
    }
}
