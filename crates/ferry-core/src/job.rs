// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The job record and its authorization state machine.
//!
//! A [`PortabilityJob`] is created by the front end in
//! [`AuthorizationState::Initial`] and only ever replaced as a whole through a
//! conditional update guarded on its current authorization state. The
//! authorization states form a line with no cycles:
//!
//! ```text
//! INITIAL -> CREDS_AVAILABLE -> CREDS_ENCRYPTION_KEY_GENERATED -> CREDS_ENCRYPTED
//!         -> CREDS_STORED | TIMED_OUT | ERROR
//! ```
//!
//! `TIMED_OUT` and `ERROR` may also be entered from any non-terminal state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::FerryError;
use crate::models::ExportInformation;
use crate::types::{AuthMode, DataVertical, JobId};

/// Authorization progress of a job's credentials between tiers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationState {
    Initial,
    CredsAvailable,
    CredsEncryptionKeyGenerated,
    CredsEncrypted,
    CredsStored,
    TimedOut,
    Error,
}

impl AuthorizationState {
    /// The next state on the happy path, or `None` once terminal.
    pub fn successor(self) -> Option<AuthorizationState> {
        use AuthorizationState::*;
        match self {
            Initial => Some(CredsAvailable),
            CredsAvailable => Some(CredsEncryptionKeyGenerated),
            CredsEncryptionKeyGenerated => Some(CredsEncrypted),
            CredsEncrypted => Some(CredsStored),
            CredsStored | TimedOut | Error => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AuthorizationState::CredsStored
                | AuthorizationState::TimedOut
                | AuthorizationState::Error
        )
    }

    /// Whether `next` may directly follow `self`.
    pub fn can_transition_to(self, next: AuthorizationState) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.successor() == Some(next)
            || matches!(next, AuthorizationState::TimedOut | AuthorizationState::Error)
    }

    /// Position along the happy path; terminal failure states sort last.
    pub fn ordinal(self) -> u8 {
        use AuthorizationState::*;
        match self {
            Initial => 0,
            CredsAvailable => 1,
            CredsEncryptionKeyGenerated => 2,
            CredsEncrypted => 3,
            CredsStored => 4,
            TimedOut => 5,
            Error => 6,
        }
    }
}

/// Job-level progress, independent of the credential hand-off.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    New,
    InProgress,
    Complete,
    Error,
    Canceled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Complete | JobState::Error | JobState::Canceled)
    }
}

/// Credential hand-off sub-record of a job.
///
/// Every credential field holds ciphertext; the session key is the only
/// plaintext secret and is never rendered by `Debug`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct JobAuthorization {
    pub state: Option<AuthorizationState>,
    /// Base64url per-job symmetric key for first-layer encryption.
    pub session_key: Option<String>,
    /// Base64url public key published by the worker that reserved the job.
    pub auth_public_key: Option<String>,
    /// Identifies the worker process that reserved the job.
    pub instance_id: Option<String>,
    pub encrypted_initial_export_auth_data: Option<String>,
    pub encrypted_initial_import_auth_data: Option<String>,
    pub encrypted_export_auth_data: Option<String>,
    pub encrypted_import_auth_data: Option<String>,
    /// One-time symmetric key, wrapped with the worker's public key.
    pub encrypted_outer_key: Option<String>,
    pub encryption_scheme: Option<String>,
}

impl JobAuthorization {
    pub fn state(&self) -> AuthorizationState {
        self.state.unwrap_or(AuthorizationState::Initial)
    }

    pub fn initial_auth_data(&self, mode: AuthMode) -> Option<&str> {
        match mode {
            AuthMode::Export => self.encrypted_initial_export_auth_data.as_deref(),
            AuthMode::Import => self.encrypted_initial_import_auth_data.as_deref(),
        }
    }

    pub fn set_initial_auth_data(&mut self, mode: AuthMode, ciphertext: String) {
        match mode {
            AuthMode::Export => self.encrypted_initial_export_auth_data = Some(ciphertext),
            AuthMode::Import => self.encrypted_initial_import_auth_data = Some(ciphertext),
        }
    }

    fn has_final_credentials(&self) -> bool {
        self.encrypted_export_auth_data.is_some()
            && self.encrypted_import_auth_data.is_some()
            && self.encrypted_outer_key.is_some()
    }

    fn has_any_final_credentials(&self) -> bool {
        self.encrypted_export_auth_data.is_some()
            || self.encrypted_import_auth_data.is_some()
            || self.encrypted_outer_key.is_some()
    }

    /// Check that the populated fields agree with the authorization state.
    pub fn validate(&self, job_id: JobId) -> Result<(), FerryError> {
        use AuthorizationState::*;
        let state = self.state();
        let fail = |msg: &str| Err(FerryError::inconsistent(job_id, format!("{state}: {msg}")));

        if self.session_key.is_none() {
            return fail("session key must be set");
        }
        match state {
            Initial | CredsAvailable => {
                if self.auth_public_key.is_some() {
                    return fail("public key must not be set before a worker reserves the job");
                }
                if self.has_any_final_credentials() {
                    return fail("encrypted credentials must not be present yet");
                }
            }
            CredsEncryptionKeyGenerated => {
                if self.auth_public_key.is_none() {
                    return fail("public key must be set");
                }
                if self.has_any_final_credentials() {
                    return fail("encrypted credentials must not be present yet");
                }
            }
            CredsEncrypted | CredsStored => {
                if self.auth_public_key.is_none() {
                    return fail("public key must be set");
                }
                if !self.has_final_credentials() {
                    return fail("both encrypted credentials and the wrapped key must be set");
                }
            }
            TimedOut | Error => {}
        }
        Ok(())
    }
}

impl fmt::Debug for JobAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobAuthorization")
            .field("state", &self.state())
            .field("session_key", &self.session_key.as_ref().map(|_| "[REDACTED]"))
            .field("auth_public_key", &self.auth_public_key.is_some())
            .field("instance_id", &self.instance_id)
            .field("has_final_credentials", &self.has_final_credentials())
            .field("encryption_scheme", &self.encryption_scheme)
            .finish()
    }
}

/// One transfer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortabilityJob {
    pub state: JobState,
    pub data_vertical: DataVertical,
    pub export_service: String,
    pub import_service: String,
    /// JSON-encoded [`ExportInformation`] to start from, if any.
    pub export_information: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub failure_reason: Option<String>,
    pub user_locale: Option<String>,
    pub authorization: JobAuthorization,
}

impl PortabilityJob {
    /// A freshly created job in `INITIAL` holding the given session key.
    pub fn new(
        data_vertical: DataVertical,
        export_service: impl Into<String>,
        import_service: impl Into<String>,
        session_key: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            state: JobState::New,
            data_vertical,
            export_service: export_service.into(),
            import_service: import_service.into(),
            export_information: None,
            created_at: now,
            updated_at: now,
            failure_reason: None,
            user_locale: None,
            authorization: JobAuthorization {
                state: Some(AuthorizationState::Initial),
                session_key: Some(session_key),
                ..Default::default()
            },
        }
    }

    pub fn auth_state(&self) -> AuthorizationState {
        self.authorization.state()
    }

    /// Decode the stored export information, if present.
    pub fn export_information(&self) -> Result<Option<ExportInformation>, FerryError> {
        self.export_information
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(FerryError::from)
    }

    pub fn set_export_information(&mut self, info: &ExportInformation) -> Result<(), FerryError> {
        self.export_information = Some(serde_json::to_string(info)?);
        Ok(())
    }

    pub fn service(&self, mode: AuthMode) -> &str {
        match mode {
            AuthMode::Export => &self.export_service,
            AuthMode::Import => &self.import_service,
        }
    }

    /// Mark the job failed with a user-visible reason.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.state = JobState::Error;
        self.failure_reason = Some(reason.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaginationToken;
    use proptest::prelude::*;

    fn all_states() -> Vec<AuthorizationState> {
        use AuthorizationState::*;
        vec![
            Initial,
            CredsAvailable,
            CredsEncryptionKeyGenerated,
            CredsEncrypted,
            CredsStored,
            TimedOut,
            Error,
        ]
    }

    fn job() -> PortabilityJob {
        PortabilityJob::new(DataVertical::Photos, "source", "dest", "c2Vzc2lvbg".into())
    }

    #[test]
    fn happy_path_walks_to_creds_stored() {
        let mut state = AuthorizationState::Initial;
        let mut steps = 0;
        while let Some(next) = state.successor() {
            assert!(state.can_transition_to(next));
            state = next;
            steps += 1;
        }
        assert_eq!(state, AuthorizationState::CredsStored);
        assert_eq!(steps, 4);
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for terminal in [
            AuthorizationState::CredsStored,
            AuthorizationState::TimedOut,
            AuthorizationState::Error,
        ] {
            for next in all_states() {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    proptest! {
        #[test]
        fn transitions_never_move_backwards(a in 0usize..7, b in 0usize..7) {
            let states = all_states();
            let (from, to) = (states[a], states[b]);
            if from.can_transition_to(to) {
                prop_assert!(to.ordinal() > from.ordinal());
            }
        }
    }

    #[test]
    fn new_job_validates_in_initial() {
        let job = job();
        assert_eq!(job.auth_state(), AuthorizationState::Initial);
        assert_eq!(job.state, JobState::New);
        job.authorization.validate(JobId::new()).unwrap();
    }

    #[test]
    fn key_generated_requires_public_key() {
        let mut job = job();
        job.authorization.state = Some(AuthorizationState::CredsEncryptionKeyGenerated);
        let err = job.authorization.validate(JobId::new()).unwrap_err();
        assert!(matches!(err, FerryError::InconsistentJobState { .. }));

        job.authorization.auth_public_key = Some("pk".into());
        job.authorization.validate(JobId::new()).unwrap();
    }

    #[test]
    fn early_states_reject_final_credentials() {
        let mut job = job();
        job.authorization.state = Some(AuthorizationState::CredsAvailable);
        job.authorization.encrypted_export_auth_data = Some("ct".into());
        assert!(job.authorization.validate(JobId::new()).is_err());
    }

    #[test]
    fn encrypted_state_requires_both_blobs_and_wrapped_key() {
        let mut job = job();
        job.authorization.state = Some(AuthorizationState::CredsEncrypted);
        job.authorization.auth_public_key = Some("pk".into());
        job.authorization.encrypted_export_auth_data = Some("e".into());
        job.authorization.encrypted_import_auth_data = Some("i".into());
        assert!(job.authorization.validate(JobId::new()).is_err());

        job.authorization.encrypted_outer_key = Some("k".into());
        job.authorization.validate(JobId::new()).unwrap();
    }

    #[test]
    fn debug_redacts_session_key() {
        let job = job();
        let debug = format!("{job:?}");
        assert!(!debug.contains("c2Vzc2lvbg"));
    }

    #[test]
    fn export_information_round_trips_through_json_field() {
        let mut job = job();
        assert!(job.export_information().unwrap().is_none());
        let info = ExportInformation::page(PaginationToken::new("media:abc"), None);
        job.set_export_information(&info).unwrap();
        assert_eq!(job.export_information().unwrap(), Some(info));
    }
}
