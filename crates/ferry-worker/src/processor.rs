// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running one claimed job to a terminal state.

use std::sync::Arc;

use tracing::{error, info, warn};

use ferry_core::lifecycle::{transition_authorization, update_guarded};
use ferry_core::retry::RetryStrategyLibrary;
use ferry_core::{
    AuthData, AuthorizationState, FerryError, IdempotentStore, JobId, JobState, JobStore,
    PortabilityJob,
};
use ferry_crypto::{SealedCredentials, open_final_credentials};
use ferry_transfer::{Copier, ExtensionRegistry, copier::CopySummary};

use crate::polling::ClaimedJob;

/// Opens a claimed job's credentials and drives its transfer.
pub struct JobProcessor {
    store: Arc<dyn JobStore>,
    results: Arc<dyn IdempotentStore>,
    registry: Arc<ExtensionRegistry>,
    retry: RetryStrategyLibrary,
}

impl JobProcessor {
    pub fn new(
        store: Arc<dyn JobStore>,
        results: Arc<dyn IdempotentStore>,
        registry: Arc<ExtensionRegistry>,
        retry: RetryStrategyLibrary,
    ) -> Self {
        Self {
            store,
            results,
            registry,
            retry,
        }
    }

    /// Process a job whose credentials were sealed for `claimed.keypair`.
    ///
    /// Returns the terminal job state. Transfer failures are recorded on the
    /// job as a failure reason; only store errors propagate.
    pub async fn process(
        &self,
        claimed: ClaimedJob,
        job: PortabilityJob,
    ) -> Result<JobState, FerryError> {
        let job_id = claimed.job_id;
        let opened = SealedCredentials::from_authorization(&job.authorization)
            .and_then(|sealed| open_final_credentials(&claimed.keypair, &sealed));
        drop(claimed);

        let (export_auth, import_auth) = match opened {
            Ok(pair) => pair,
            Err(e) => {
                error!(job_id = %job_id, error = %e, "failed to open job credentials");
                transition_authorization(
                    self.store.as_ref(),
                    job_id,
                    AuthorizationState::CredsEncrypted,
                    AuthorizationState::Error,
                    |job| job.fail(e.to_string()),
                )
                .await?;
                return Ok(JobState::Error);
            }
        };

        transition_authorization(
            self.store.as_ref(),
            job_id,
            AuthorizationState::CredsEncrypted,
            AuthorizationState::CredsStored,
            |_| {},
        )
        .await?;
        update_guarded(self.store.as_ref(), job_id, AuthorizationState::CredsStored, |job| {
            job.state = JobState::InProgress;
        })
        .await?;
        info!(
            job_id = %job_id,
            vertical = %job.data_vertical,
            export = %job.export_service,
            import = %job.import_service,
            "transfer started"
        );

        match self.transfer(&job, job_id, &export_auth, &import_auth).await {
            Ok(summary) => {
                update_guarded(self.store.as_ref(), job_id, AuthorizationState::CredsStored, |job| {
                    job.state = JobState::Complete;
                })
                .await?;
                info!(
                    job_id = %job_id,
                    iterations = summary.iterations,
                    failed_items = summary.errors.len(),
                    "transfer complete"
                );
                Ok(JobState::Complete)
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "transfer failed");
                update_guarded(self.store.as_ref(), job_id, AuthorizationState::CredsStored, |job| {
                    job.fail(e.to_string());
                })
                .await?;
                Ok(JobState::Error)
            }
        }
    }

    async fn transfer(
        &self,
        job: &PortabilityJob,
        job_id: JobId,
        export_auth: &AuthData,
        import_auth: &AuthData,
    ) -> Result<CopySummary, FerryError> {
        let exporter = self.registry.exporter(&job.export_service, job.data_vertical)?;
        let importer = self.registry.importer(&job.import_service, job.data_vertical)?;
        let copier = Copier::new(
            self.store.clone(),
            self.results.clone(),
            exporter,
            importer,
            self.retry.clone(),
        );
        copier
            .copy(job_id, export_auth, import_auth, job.export_information()?)
            .await
    }
}
