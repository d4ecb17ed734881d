// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Versioned, self-describing storage encoding of a job record.
//!
//! Each field is written as a tagged scalar so any backend (or any other
//! implementation reading the same store) can decode it without knowing Rust
//! types. Absent optional fields are simply omitted.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FerryError;
use crate::job::{AuthorizationState, JobAuthorization, JobState, PortabilityJob};
use crate::types::DataVertical;

/// Current job entity schema version.
pub const JOB_SCHEMA_VERSION: u32 = 1;

/// One encoded field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "snake_case")]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

/// A job record as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEntity {
    pub version: u32,
    pub fields: BTreeMap<String, FieldValue>,
}

mod field {
    pub const STATE: &str = "state";
    pub const DATA_VERTICAL: &str = "data_vertical";
    pub const EXPORT_SERVICE: &str = "export_service";
    pub const IMPORT_SERVICE: &str = "import_service";
    pub const EXPORT_INFORMATION: &str = "export_information";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
    pub const FAILURE_REASON: &str = "failure_reason";
    pub const USER_LOCALE: &str = "user_locale";
    pub const AUTH_STATE: &str = "auth.state";
    pub const SESSION_KEY: &str = "auth.session_key";
    pub const PUBLIC_KEY: &str = "auth.public_key";
    pub const INSTANCE_ID: &str = "auth.instance_id";
    pub const INITIAL_EXPORT: &str = "auth.encrypted_initial_export_auth_data";
    pub const INITIAL_IMPORT: &str = "auth.encrypted_initial_import_auth_data";
    pub const FINAL_EXPORT: &str = "auth.encrypted_export_auth_data";
    pub const FINAL_IMPORT: &str = "auth.encrypted_import_auth_data";
    pub const OUTER_KEY: &str = "auth.encrypted_outer_key";
    pub const SCHEME: &str = "auth.encryption_scheme";
}

impl JobEntity {
    fn new() -> Self {
        Self {
            version: JOB_SCHEMA_VERSION,
            fields: BTreeMap::new(),
        }
    }

    fn put_str(&mut self, name: &str, value: Option<&str>) {
        if let Some(v) = value {
            self.fields.insert(name.to_string(), FieldValue::Str(v.to_string()));
        }
    }

    fn put_time(&mut self, name: &str, value: DateTime<Utc>) {
        self.fields.insert(name.to_string(), FieldValue::Timestamp(value));
    }

    fn opt_str(&self, name: &str) -> Result<Option<String>, FerryError> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(FieldValue::Str(s)) => Ok(Some(s.clone())),
            Some(other) => Err(FerryError::storage(format!(
                "field `{name}` expected str, found {other:?}"
            ))),
        }
    }

    fn req_str(&self, name: &str) -> Result<String, FerryError> {
        self.opt_str(name)?
            .ok_or_else(|| FerryError::storage(format!("missing required field `{name}`")))
    }

    fn req_time(&self, name: &str) -> Result<DateTime<Utc>, FerryError> {
        match self.fields.get(name) {
            Some(FieldValue::Timestamp(t)) => Ok(*t),
            Some(other) => Err(FerryError::storage(format!(
                "field `{name}` expected timestamp, found {other:?}"
            ))),
            None => Err(FerryError::storage(format!("missing required field `{name}`"))),
        }
    }

    fn parse<T: FromStr>(&self, name: &str) -> Result<T, FerryError> {
        let raw = self.req_str(name)?;
        raw.parse()
            .map_err(|_| FerryError::storage(format!("field `{name}` has unknown value `{raw}`")))
    }

    pub fn to_json(&self) -> Result<String, FerryError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, FerryError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl PortabilityJob {
    pub fn to_entity(&self) -> JobEntity {
        let mut e = JobEntity::new();
        let auth = &self.authorization;
        e.put_str(field::STATE, Some(&self.state.to_string()));
        e.put_str(field::DATA_VERTICAL, Some(&self.data_vertical.to_string()));
        e.put_str(field::EXPORT_SERVICE, Some(&self.export_service));
        e.put_str(field::IMPORT_SERVICE, Some(&self.import_service));
        e.put_str(field::EXPORT_INFORMATION, self.export_information.as_deref());
        e.put_time(field::CREATED_AT, self.created_at);
        e.put_time(field::UPDATED_AT, self.updated_at);
        e.put_str(field::FAILURE_REASON, self.failure_reason.as_deref());
        e.put_str(field::USER_LOCALE, self.user_locale.as_deref());
        e.put_str(field::AUTH_STATE, Some(&auth.state().to_string()));
        e.put_str(field::SESSION_KEY, auth.session_key.as_deref());
        e.put_str(field::PUBLIC_KEY, auth.auth_public_key.as_deref());
        e.put_str(field::INSTANCE_ID, auth.instance_id.as_deref());
        e.put_str(field::INITIAL_EXPORT, auth.encrypted_initial_export_auth_data.as_deref());
        e.put_str(field::INITIAL_IMPORT, auth.encrypted_initial_import_auth_data.as_deref());
        e.put_str(field::FINAL_EXPORT, auth.encrypted_export_auth_data.as_deref());
        e.put_str(field::FINAL_IMPORT, auth.encrypted_import_auth_data.as_deref());
        e.put_str(field::OUTER_KEY, auth.encrypted_outer_key.as_deref());
        e.put_str(field::SCHEME, auth.encryption_scheme.as_deref());
        e
    }

    pub fn from_entity(e: &JobEntity) -> Result<Self, FerryError> {
        if e.version != JOB_SCHEMA_VERSION {
            return Err(FerryError::storage(format!(
                "unsupported job schema version {}",
                e.version
            )));
        }
        let state: JobState = e.parse(field::STATE)?;
        let data_vertical: DataVertical = e.parse(field::DATA_VERTICAL)?;
        let auth_state: AuthorizationState = e.parse(field::AUTH_STATE)?;
        Ok(Self {
            state,
            data_vertical,
            export_service: e.req_str(field::EXPORT_SERVICE)?,
            import_service: e.req_str(field::IMPORT_SERVICE)?,
            export_information: e.opt_str(field::EXPORT_INFORMATION)?,
            created_at: e.req_time(field::CREATED_AT)?,
            updated_at: e.req_time(field::UPDATED_AT)?,
            failure_reason: e.opt_str(field::FAILURE_REASON)?,
            user_locale: e.opt_str(field::USER_LOCALE)?,
            authorization: JobAuthorization {
                state: Some(auth_state),
                session_key: e.opt_str(field::SESSION_KEY)?,
                auth_public_key: e.opt_str(field::PUBLIC_KEY)?,
                instance_id: e.opt_str(field::INSTANCE_ID)?,
                encrypted_initial_export_auth_data: e.opt_str(field::INITIAL_EXPORT)?,
                encrypted_initial_import_auth_data: e.opt_str(field::INITIAL_IMPORT)?,
                encrypted_export_auth_data: e.opt_str(field::FINAL_EXPORT)?,
                encrypted_import_auth_data: e.opt_str(field::FINAL_IMPORT)?,
                encrypted_outer_key: e.opt_str(field::OUTER_KEY)?,
                encryption_scheme: e.opt_str(field::SCHEME)?,
            },
        })
    }
}
