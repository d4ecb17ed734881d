// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Claiming unassigned jobs and waiting for their credentials.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ferry_config::model::{CryptoConfig, WorkerConfig};
use ferry_core::lifecycle::{require_job, transition_authorization};
use ferry_core::{AuthorizationState, FerryError, JobId, JobStore, PortabilityJob};
use ferry_crypto::WorkerKeyPair;

/// A job this worker won, with the keypair whose public half it published.
#[derive(Debug)]
pub struct ClaimedJob {
    pub job_id: JobId,
    pub keypair: WorkerKeyPair,
}

/// Finds jobs ready for a worker and reserves them.
pub struct JobPoller {
    store: Arc<dyn JobStore>,
    instance_id: String,
    rsa_key_bits: usize,
    credential_poll_interval: Duration,
    credential_timeout: Duration,
}

impl JobPoller {
    pub fn new(store: Arc<dyn JobStore>, instance_id: impl Into<String>, rsa_key_bits: usize) -> Self {
        Self {
            store,
            instance_id: instance_id.into(),
            rsa_key_bits,
            credential_poll_interval: Duration::from_secs(5),
            credential_timeout: Duration::from_secs(600),
        }
    }

    /// A poller configured from the `[worker]` and `[crypto]` sections.
    ///
    /// Without a configured instance id a random one is used.
    pub fn from_config(store: Arc<dyn JobStore>, worker: &WorkerConfig, crypto: &CryptoConfig) -> Self {
        let instance_id = worker
            .instance_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Self::new(store, instance_id, crypto.rsa_key_bits).with_credential_wait(
            Duration::from_secs(worker.credential_poll_interval_secs),
            Duration::from_secs(worker.credential_timeout_secs),
        )
    }

    pub fn with_credential_wait(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.credential_poll_interval = poll_interval;
        self.credential_timeout = timeout;
        self
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Try to reserve one job in `CREDS_AVAILABLE`.
    ///
    /// Returns `None` when no job is waiting or another worker won the
    /// conditional write. A lost job is never retried.
    pub async fn poll_for_unassigned_job(&self) -> Result<Option<ClaimedJob>, FerryError> {
        let Some(job_id) = self
            .store
            .find_first_job_in_state(AuthorizationState::CredsAvailable)
            .await?
        else {
            return Ok(None);
        };
        debug!(job_id = %job_id, "found job with credentials available");

        let bits = self.rsa_key_bits;
        let keypair = tokio::task::spawn_blocking(move || WorkerKeyPair::generate(bits))
            .await
            .map_err(|e| FerryError::Internal(format!("key generation task failed: {e}")))??;
        let public_key = keypair.public_key().encode()?;
        let instance_id = self.instance_id.clone();

        let claimed = transition_authorization(
            self.store.as_ref(),
            job_id,
            AuthorizationState::CredsAvailable,
            AuthorizationState::CredsEncryptionKeyGenerated,
            |job| {
                job.authorization.auth_public_key = Some(public_key);
                job.authorization.instance_id = Some(instance_id);
            },
        )
        .await;

        match claimed {
            Ok(_) => {
                info!(job_id = %job_id, instance_id = %self.instance_id, "claimed job");
                Ok(Some(ClaimedJob { job_id, keypair }))
            }
            Err(e @ FerryError::InconsistentJobState { .. }) => {
                info!(job_id = %job_id, error = %e, "lost claim race, abandoning job");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Wait until the front end has sealed credentials for `job_id`.
    ///
    /// Returns the job once it reaches `CREDS_ENCRYPTED`. On timeout the job
    /// is moved to `TIMED_OUT` and `None` is returned; on cancellation `None`
    /// is returned and the job is left for an external supervisor.
    pub async fn wait_for_credentials(
        &self,
        job_id: JobId,
        cancel: &CancellationToken,
    ) -> Result<Option<PortabilityJob>, FerryError> {
        let deadline = Instant::now() + self.credential_timeout;
        loop {
            let job = require_job(self.store.as_ref(), job_id).await?;
            match job.auth_state() {
                AuthorizationState::CredsEncrypted => {
                    debug!(job_id = %job_id, "credentials sealed for this worker");
                    return Ok(Some(job));
                }
                AuthorizationState::CredsEncryptionKeyGenerated => {}
                other => {
                    return Err(FerryError::inconsistent(
                        job_id,
                        format!("unexpected authorization state {other} while waiting for credentials"),
                    ));
                }
            }

            if Instant::now() >= deadline {
                warn!(
                    job_id = %job_id,
                    timeout_secs = self.credential_timeout.as_secs(),
                    "timed out waiting for credentials"
                );
                transition_authorization(
                    self.store.as_ref(),
                    job_id,
                    AuthorizationState::CredsEncryptionKeyGenerated,
                    AuthorizationState::TimedOut,
                    |job| job.fail("timed out waiting for credentials"),
                )
                .await?;
                return Ok(None);
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(job_id = %job_id, "shutdown while waiting for credentials");
                    return Ok(None);
                }
                _ = tokio::time::sleep(self.credential_poll_interval) => {}
            }
        }
    }
}
