// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The worker run loop: poll, wait for credentials, process.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use ferry_config::model::FerryConfig;
use ferry_core::{FerryError, IdempotentStore, JobState, JobStore};
use ferry_transfer::ExtensionRegistry;

use crate::polling::JobPoller;
use crate::processor::JobProcessor;

/// One worker process handling one job at a time.
pub struct Worker {
    poller: JobPoller,
    processor: JobProcessor,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(poller: JobPoller, processor: JobProcessor, poll_interval: Duration) -> Self {
        Self {
            poller,
            processor,
            poll_interval,
        }
    }

    /// Assemble a worker from configuration and its collaborators.
    pub fn from_config(
        config: &FerryConfig,
        store: Arc<dyn JobStore>,
        results: Arc<dyn IdempotentStore>,
        registry: Arc<ExtensionRegistry>,
    ) -> Self {
        let poller = JobPoller::from_config(store.clone(), &config.worker, &config.crypto);
        let processor = JobProcessor::new(store, results, registry, config.transfer.retry.clone());
        Self::new(
            poller,
            processor,
            Duration::from_secs(config.worker.poll_interval_secs),
        )
    }

    pub fn instance_id(&self) -> &str {
        self.poller.instance_id()
    }

    /// Claim at most one job and see it through.
    ///
    /// Returns the job's terminal state, or `None` when nothing was claimed
    /// or the credentials never arrived.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<Option<JobState>, FerryError> {
        let Some(claimed) = self.poller.poll_for_unassigned_job().await? else {
            return Ok(None);
        };
        let Some(job) = self.poller.wait_for_credentials(claimed.job_id, cancel).await? else {
            return Ok(None);
        };
        self.processor.process(claimed, job).await.map(Some)
    }

    /// Process jobs until `cancel` fires.
    ///
    /// Polls again immediately after finishing a job and sleeps for the poll
    /// interval when there was nothing to do.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(instance_id = %self.instance_id(), "worker started");
        while !cancel.is_cancelled() {
            match self.run_once(&cancel).await {
                Ok(Some(state)) => {
                    debug!(%state, "job finished, polling again");
                    continue;
                }
                Ok(None) => {}
                Err(e) => error!(error = %e, "worker iteration failed"),
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        info!(instance_id = %self.instance_id(), "worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_storage::MemoryJobStore;
    use tracing_test::traced_test;

    fn worker(store: Arc<MemoryJobStore>) -> Worker {
        let poller = JobPoller::new(store.clone(), "w1", 1024);
        let processor = JobProcessor::new(
            store.clone(),
            store,
            Arc::new(ExtensionRegistry::new()),
            Default::default(),
        );
        Worker::new(poller, processor, Duration::from_secs(20))
    }

    #[tokio::test]
    async fn idle_run_once_claims_nothing() {
        let store = Arc::new(MemoryJobStore::new());
        let outcome = worker(store).run_once(&CancellationToken::new()).await.unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn run_returns_once_cancelled() {
        let store = Arc::new(MemoryJobStore::new());
        let worker = worker(store);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(45)).await;
            trigger.cancel();
        });
        worker.run(cancel).await;
        assert!(logs_contain("worker stopped"));
    }
}
