// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Front-end operations on a job, from creation to deletion.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info};

use ferry_core::lifecycle::{require_job, transition_authorization, update_guarded};
use ferry_core::models::{ErrorDetail, ExportInformation};
use ferry_core::{
    AuthData, AuthMode, AuthorizationState, DataVertical, FerryError, JobId, JobState, JobStore,
    PortabilityJob,
};
use ferry_crypto::{
    SymmetricKey, decrypt_initial_auth_data, encrypt_initial_auth_data, seal_final_credentials,
};

use crate::auth::AuthServiceRegistry;

/// A read-only view of a job for status pages and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub job_id: JobId,
    pub state: JobState,
    pub authorization_state: AuthorizationState,
    pub data_vertical: DataVertical,
    pub export_service: String,
    pub import_service: String,
    pub failure_reason: Option<String>,
    pub counts: BTreeMap<String, i64>,
    pub errors: Vec<ErrorDetail>,
}

/// Drives jobs through the front-end half of the credential hand-off.
pub struct JobManager {
    store: Arc<dyn JobStore>,
    auth: Arc<AuthServiceRegistry>,
    callback_base_url: String,
}

impl JobManager {
    pub fn new(
        store: Arc<dyn JobStore>,
        auth: Arc<AuthServiceRegistry>,
        callback_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            auth,
            callback_base_url: callback_base_url.into(),
        }
    }

    /// Create a job in `INITIAL` with a fresh session key.
    pub async fn create_job(
        &self,
        data_vertical: DataVertical,
        export_service: &str,
        import_service: &str,
        export_information: Option<&ExportInformation>,
    ) -> Result<JobId, FerryError> {
        let job_id = JobId::new();
        let session_key = SymmetricKey::generate()?;
        let mut job = PortabilityJob::new(
            data_vertical,
            export_service,
            import_service,
            session_key.encode(),
        );
        if let Some(info) = export_information {
            job.set_export_information(info)?;
        }
        self.store.create_job(job_id, &job).await?;
        info!(
            job_id = %job_id,
            vertical = %data_vertical,
            export = export_service,
            import = import_service,
            "job created"
        );
        Ok(job_id)
    }

    /// Start the `mode` side's authorization flow and return the redirect URL.
    ///
    /// Initial auth data the flow needs at callback time is stored encrypted
    /// under the job's session key.
    pub async fn begin_authorization(&self, job_id: JobId, mode: AuthMode) -> Result<String, FerryError> {
        let job = require_job(self.store.as_ref(), job_id).await?;
        let generator = self
            .auth
            .generator(job.service(mode), job.data_vertical, mode)?;
        let flow = generator
            .generate_configuration(&self.callback_base_url, job_id)
            .await?;

        if let Some(initial) = &flow.initial_auth_data {
            let session_key = session_key(job_id, &job)?;
            let ciphertext = encrypt_initial_auth_data(&session_key, initial)?;
            update_guarded(self.store.as_ref(), job_id, AuthorizationState::Initial, |job| {
                job.authorization.set_initial_auth_data(mode, ciphertext);
            })
            .await?;
            debug!(job_id = %job_id, %mode, "stored encrypted initial auth data");
        }
        Ok(flow.auth_url)
    }

    /// Finish the `mode` side's flow by exchanging the callback code.
    ///
    /// The returned credentials are never persisted in plaintext; the caller
    /// holds them until [`JobManager::submit_credentials`].
    pub async fn complete_authorization(
        &self,
        job_id: JobId,
        mode: AuthMode,
        auth_code: &str,
        extra: Option<&str>,
    ) -> Result<AuthData, FerryError> {
        let job = require_job(self.store.as_ref(), job_id).await?;
        let generator = self
            .auth
            .generator(job.service(mode), job.data_vertical, mode)?;
        let initial = match job.authorization.initial_auth_data(mode) {
            Some(ciphertext) => Some(decrypt_initial_auth_data(
                &session_key(job_id, &job)?,
                ciphertext,
            )?),
            None => None,
        };
        let auth = generator
            .generate_auth_data(
                &self.callback_base_url,
                auth_code,
                job_id,
                initial.as_ref(),
                extra,
            )
            .await?;
        debug!(job_id = %job_id, %mode, kind = auth.kind(), "authorization completed");
        Ok(auth)
    }

    /// Both sides are authorized; make the job visible to workers.
    pub async fn mark_credentials_available(&self, job_id: JobId) -> Result<(), FerryError> {
        transition_authorization(
            self.store.as_ref(),
            job_id,
            AuthorizationState::Initial,
            AuthorizationState::CredsAvailable,
            |_| {},
        )
        .await?;
        info!(job_id = %job_id, "credentials available to workers");
        Ok(())
    }

    /// Poll until a worker has published its public key for `job_id`.
    pub async fn await_worker_key(
        &self,
        job_id: JobId,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<String, FerryError> {
        let deadline = Instant::now() + timeout;
        loop {
            let job = require_job(self.store.as_ref(), job_id).await?;
            match job.auth_state() {
                AuthorizationState::CredsAvailable => {}
                AuthorizationState::CredsEncryptionKeyGenerated => {
                    return job.authorization.auth_public_key.ok_or_else(|| {
                        FerryError::inconsistent(job_id, "claimed job has no public key")
                    });
                }
                other => {
                    return Err(FerryError::inconsistent(
                        job_id,
                        format!("unexpected authorization state {other} while waiting for a worker"),
                    ));
                }
            }
            if Instant::now() >= deadline {
                return Err(FerryError::Timeout { duration: timeout });
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Seal both sides' final credentials for the claiming worker.
    ///
    /// A fresh one-time key is generated and discarded inside the sealing
    /// call; only ciphertexts reach the store.
    pub async fn submit_credentials(
        &self,
        job_id: JobId,
        export_auth: &AuthData,
        import_auth: &AuthData,
    ) -> Result<(), FerryError> {
        let job = require_job(self.store.as_ref(), job_id).await?;
        let public_key = job
            .authorization
            .auth_public_key
            .as_deref()
            .ok_or_else(|| FerryError::Credential("job has no worker public key".into()))?;
        let sealed = seal_final_credentials(public_key, export_auth, import_auth)?;
        transition_authorization(
            self.store.as_ref(),
            job_id,
            AuthorizationState::CredsEncryptionKeyGenerated,
            AuthorizationState::CredsEncrypted,
            |job| sealed.apply_to(&mut job.authorization),
        )
        .await?;
        info!(job_id = %job_id, "final credentials sealed for worker");
        Ok(())
    }

    pub async fn job_status(&self, job_id: JobId) -> Result<JobStatus, FerryError> {
        let job = require_job(self.store.as_ref(), job_id).await?;
        Ok(JobStatus {
            job_id,
            state: job.state,
            authorization_state: job.auth_state(),
            data_vertical: job.data_vertical,
            export_service: job.export_service,
            import_service: job.import_service,
            failure_reason: job.failure_reason,
            counts: self.store.counts_for_job(job_id).await?,
            errors: self.store.errors_for_job(job_id).await?,
        })
    }

    /// Delete a finished job and everything stored under it.
    ///
    /// Refused while the job or its credential hand-off is still live.
    pub async fn delete_job(&self, job_id: JobId) -> Result<(), FerryError> {
        let job = require_job(self.store.as_ref(), job_id).await?;
        if !job.state.is_terminal() && !job.auth_state().is_terminal() {
            return Err(FerryError::inconsistent(
                job_id,
                format!(
                    "cannot delete a live job (state {}, authorization {})",
                    job.state,
                    job.auth_state()
                ),
            ));
        }
        if job.state == JobState::InProgress {
            return Err(FerryError::inconsistent(job_id, "cannot delete a running job"));
        }
        self.store.remove(job_id).await?;
        info!(job_id = %job_id, "job deleted");
        Ok(())
    }
}

fn session_key(job_id: JobId, job: &PortabilityJob) -> Result<SymmetricKey, FerryError> {
    let encoded = job
        .authorization
        .session_key
        .as_deref()
        .ok_or_else(|| FerryError::Credential(format!("job {job_id} has no session key")))?;
    SymmetricKey::decode(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ferry_core::traits::AuthFlowConfiguration;
    use ferry_core::{AdapterType, AuthDataGenerator, PluginAdapter};
    use ferry_crypto::{SealedCredentials, WorkerKeyPair, open_final_credentials};
    use ferry_storage::MemoryJobStore;

    /// OAuth1-style generator: the request secret is initial auth data.
    struct RequestTokenFlow;

    #[async_trait]
    impl PluginAdapter for RequestTokenFlow {
        fn name(&self) -> &str {
            "oauth1"
        }

        fn adapter_type(&self) -> AdapterType {
            AdapterType::AuthGenerator
        }
    }

    #[async_trait]
    impl AuthDataGenerator for RequestTokenFlow {
        async fn generate_configuration(
            &self,
            callback_base_url: &str,
            job_id: JobId,
        ) -> Result<AuthFlowConfiguration, FerryError> {
            Ok(AuthFlowConfiguration {
                auth_url: format!("https://provider.example/authorize?cb={callback_base_url}&job={job_id}"),
                initial_auth_data: Some(AuthData::TokenSecret {
                    token: "request-token".into(),
                    secret: "request-secret".into(),
                }),
            })
        }

        async fn generate_auth_data(
            &self,
            _callback_base_url: &str,
            auth_code: &str,
            _job_id: JobId,
            initial_auth_data: Option<&AuthData>,
            _extra: Option<&str>,
        ) -> Result<AuthData, FerryError> {
            match initial_auth_data {
                Some(AuthData::TokenSecret { secret, .. }) if secret == "request-secret" => {
                    Ok(AuthData::TokenSecret {
                        token: format!("access-{auth_code}"),
                        secret: "access-secret".into(),
                    })
                }
                _ => Err(FerryError::Credential("missing request secret".into())),
            }
        }
    }

    fn manager(store: Arc<MemoryJobStore>) -> JobManager {
        let mut auth = AuthServiceRegistry::new();
        for mode in [AuthMode::Export, AuthMode::Import] {
            auth.register("flickr", DataVertical::Photos, mode, Arc::new(RequestTokenFlow));
        }
        JobManager::new(store, Arc::new(auth), "https://ferry.example/callback")
    }

    #[tokio::test]
    async fn create_job_starts_initial_with_session_key() {
        let store = Arc::new(MemoryJobStore::new());
        let manager = manager(store.clone());
        let id = manager
            .create_job(DataVertical::Photos, "flickr", "flickr", None)
            .await
            .unwrap();

        let job = store.find_job(id).await.unwrap().unwrap();
        assert_eq!(job.auth_state(), AuthorizationState::Initial);
        assert_eq!(job.state, JobState::New);
        assert!(SymmetricKey::decode(job.authorization.session_key.as_deref().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn initial_auth_data_is_stored_encrypted_and_reused() {
        let store = Arc::new(MemoryJobStore::new());
        let manager = manager(store.clone());
        let id = manager
            .create_job(DataVertical::Photos, "flickr", "flickr", None)
            .await
            .unwrap();

        let url = manager.begin_authorization(id, AuthMode::Export).await.unwrap();
        assert!(url.contains(&id.to_string()));

        let job = store.find_job(id).await.unwrap().unwrap();
        let stored = job.authorization.initial_auth_data(AuthMode::Export).unwrap();
        assert!(!stored.contains("request-secret"));
        assert!(job.authorization.initial_auth_data(AuthMode::Import).is_none());

        let auth = manager
            .complete_authorization(id, AuthMode::Export, "code-1", None)
            .await
            .unwrap();
        assert_eq!(
            auth,
            AuthData::TokenSecret {
                token: "access-code-1".into(),
                secret: "access-secret".into(),
            }
        );
    }

    #[tokio::test]
    async fn unknown_service_fails_authorization() {
        let store = Arc::new(MemoryJobStore::new());
        let manager = manager(store);
        let id = manager
            .create_job(DataVertical::Photos, "nowhere", "flickr", None)
            .await
            .unwrap();
        let err = manager.begin_authorization(id, AuthMode::Export).await.unwrap_err();
        assert!(matches!(err, FerryError::Config(_)));
    }

    #[tokio::test]
    async fn sealed_credentials_open_only_with_worker_key() {
        let store = Arc::new(MemoryJobStore::new());
        let manager = manager(store.clone());
        let id = manager
            .create_job(DataVertical::Photos, "flickr", "flickr", None)
            .await
            .unwrap();
        manager.mark_credentials_available(id).await.unwrap();

        let keypair = WorkerKeyPair::generate(1024).unwrap();
        let public_key = keypair.public_key().encode().unwrap();
        transition_authorization(
            store.as_ref(),
            id,
            AuthorizationState::CredsAvailable,
            AuthorizationState::CredsEncryptionKeyGenerated,
            |job| job.authorization.auth_public_key = Some(public_key.clone()),
        )
        .await
        .unwrap();

        let published = manager
            .await_worker_key(id, Duration::from_millis(5), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(published, public_key);

        let export = AuthData::TokenSecret {
            token: "e".into(),
            secret: "es".into(),
        };
        let import = AuthData::TokenSecret {
            token: "i".into(),
            secret: "is".into(),
        };
        manager.submit_credentials(id, &export, &import).await.unwrap();

        let job = store.find_job(id).await.unwrap().unwrap();
        assert_eq!(job.auth_state(), AuthorizationState::CredsEncrypted);
        let sealed = SealedCredentials::from_authorization(&job.authorization).unwrap();
        let (e, i) = open_final_credentials(&keypair, &sealed).unwrap();
        assert_eq!((e, i), (export, import));

        let stranger = WorkerKeyPair::generate(1024).unwrap();
        assert!(open_final_credentials(&stranger, &sealed).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn await_worker_key_times_out_when_unclaimed() {
        let store = Arc::new(MemoryJobStore::new());
        let manager = manager(store);
        let id = manager
            .create_job(DataVertical::Photos, "flickr", "flickr", None)
            .await
            .unwrap();
        manager.mark_credentials_available(id).await.unwrap();

        let err = manager
            .await_worker_key(id, Duration::from_secs(1), Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, FerryError::Timeout { .. }));
    }

    #[tokio::test]
    async fn delete_refuses_live_jobs() {
        let store = Arc::new(MemoryJobStore::new());
        let manager = manager(store.clone());
        let id = manager
            .create_job(DataVertical::Photos, "flickr", "flickr", None)
            .await
            .unwrap();

        let err = manager.delete_job(id).await.unwrap_err();
        assert!(matches!(err, FerryError::InconsistentJobState { .. }));

        transition_authorization(
            store.as_ref(),
            id,
            AuthorizationState::Initial,
            AuthorizationState::Error,
            |job| job.fail("user cancelled authorization"),
        )
        .await
        .unwrap();
        manager.delete_job(id).await.unwrap();
        assert!(store.find_job(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn status_reports_counts_and_errors() {
        let store = Arc::new(MemoryJobStore::new());
        let manager = manager(store.clone());
        let id = manager
            .create_job(DataVertical::Photos, "flickr", "flickr", None)
            .await
            .unwrap();
        store
            .add_counts(id, &BTreeMap::from([("PHOTOS".to_string(), 3)]))
            .await
            .unwrap();

        let status = manager.job_status(id).await.unwrap();
        assert_eq!(status.counts["PHOTOS"], 3);
        assert!(status.errors.is_empty());
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["authorization_state"], "INITIAL");
    }
}
