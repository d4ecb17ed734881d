// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Ferry transfer system.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::types::JobId;

/// The primary error type used across all Ferry traits and core operations.
#[derive(Debug, Error)]
pub enum FerryError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, schema mismatch).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A conditional job update found a missing record or an unexpected state.
    ///
    /// Usually means another tier won a race; the operation should be abandoned.
    #[error("inconsistent job state for {job_id}: {message}")]
    InconsistentJobState { job_id: JobId, message: String },

    /// A pagination token did not carry a prefix the receiving phase accepts.
    #[error("invalid pagination token `{token}`, expected prefix {expected}")]
    InvalidPaginationToken { token: String, expected: String },

    /// Decrypt failure or missing key material. Never retried with the same key.
    #[error("credential error: {0}")]
    Credential(String),

    /// Network or 5xx-class failure from an exporter or importer call.
    #[error("transient provider error: {message}")]
    Transient {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A single item could not be processed; the rest of its container continues.
    #[error("item `{id}` failed: {message}")]
    Item { id: String, message: String },

    /// The destination service has no storage left for this user.
    #[error("destination storage exhausted on {service}")]
    DestinationFull { service: String },

    /// Permission was denied for the whole job, not just one item.
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    /// A retry policy gave up on a unit of work.
    #[error("gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        source: Box<FerryError>,
    },

    /// JSON encoding or decoding of a persisted payload failed.
    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Stable tag for each [`FerryError`] variant.
///
/// Used by retry policy mappings and persisted in error details, where the
/// error value itself cannot be stored.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Storage,
    InconsistentJobState,
    InvalidPaginationToken,
    Credential,
    Transient,
    Item,
    DestinationFull,
    PermissionDenied,
    RetriesExhausted,
    Serialization,
    Timeout,
    Internal,
}

/// How a failure should be handled by the executor and the driver loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FailureClass {
    /// Worth another attempt under the active retry strategy.
    Retryable,
    /// Record against the item and continue with the rest of the container.
    Skippable,
    /// Abort the job and surface a failure reason.
    Fatal,
}

impl FerryError {
    /// Shorthand for a storage error wrapping a plain message.
    pub fn storage(message: impl Into<String>) -> Self {
        FerryError::Storage {
            source: message.into().into(),
        }
    }

    /// Shorthand for an inconsistent-state error on `job_id`.
    pub fn inconsistent(job_id: JobId, message: impl Into<String>) -> Self {
        FerryError::InconsistentJobState {
            job_id,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FerryError::Config(_) => ErrorKind::Config,
            FerryError::Storage { .. } => ErrorKind::Storage,
            FerryError::InconsistentJobState { .. } => ErrorKind::InconsistentJobState,
            FerryError::InvalidPaginationToken { .. } => ErrorKind::InvalidPaginationToken,
            FerryError::Credential(_) => ErrorKind::Credential,
            FerryError::Transient { .. } => ErrorKind::Transient,
            FerryError::Item { .. } => ErrorKind::Item,
            FerryError::DestinationFull { .. } => ErrorKind::DestinationFull,
            FerryError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            FerryError::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            FerryError::Serialization { .. } => ErrorKind::Serialization,
            FerryError::Timeout { .. } => ErrorKind::Timeout,
            FerryError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Default classification used when a provider does not supply its own.
    pub fn class(&self) -> FailureClass {
        match self {
            FerryError::Transient { .. } | FerryError::Timeout { .. } => FailureClass::Retryable,
            FerryError::Item { .. } => FailureClass::Skippable,
            _ => FailureClass::Fatal,
        }
    }

    /// The innermost error, looking through retry wrappers.
    pub fn root(&self) -> &FerryError {
        match self {
            FerryError::RetriesExhausted { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_classes_follow_taxonomy() {
        let transient = FerryError::Transient {
            message: "503".into(),
            source: None,
        };
        assert_eq!(transient.class(), FailureClass::Retryable);

        let item = FerryError::Item {
            id: "p1".into(),
            message: "hash mismatch".into(),
        };
        assert_eq!(item.class(), FailureClass::Skippable);

        let full = FerryError::DestinationFull {
            service: "dest".into(),
        };
        assert_eq!(full.class(), FailureClass::Fatal);

        let token = FerryError::InvalidPaginationToken {
            token: "x".into(),
            expected: "media:".into(),
        };
        assert_eq!(token.class(), FailureClass::Fatal);
        assert_eq!(FerryError::Credential("bad".into()).class(), FailureClass::Fatal);
    }

    #[test]
    fn root_unwraps_nested_retry_errors() {
        let err = FerryError::RetriesExhausted {
            attempts: 3,
            source: Box::new(FerryError::Item {
                id: "a".into(),
                message: "gone".into(),
            }),
        };
        assert_eq!(err.kind(), ErrorKind::RetriesExhausted);
        assert_eq!(err.root().kind(), ErrorKind::Item);
    }

    #[test]
    fn error_kind_round_trips_through_strings() {
        use std::str::FromStr;
        assert_eq!(ErrorKind::DestinationFull.to_string(), "destination_full");
        assert_eq!(
            ErrorKind::from_str("inconsistent_job_state").unwrap(),
            ErrorKind::InconsistentJobState
        );
    }
}
