// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Ferry data transfer system.
//!
//! This crate provides the job record and its authorization state machine,
//! the error taxonomy, the data model exchanged between exporters and
//! importers, and the trait definitions for every pluggable collaborator.

pub mod entity;
pub mod error;
pub mod job;
pub mod lifecycle;
pub mod models;
pub mod pagination;
pub mod retry;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ErrorKind, FailureClass, FerryError};
pub use job::{AuthorizationState, JobAuthorization, JobState, PortabilityJob};
pub use types::{AdapterType, AuthData, AuthMode, DataVertical, HealthStatus, JobId};

pub use traits::{
    AuthDataGenerator, ErrorClassifier, IdempotentStore, JobStore, PluginAdapter,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ferry_error_has_all_taxonomy_variants() {
        let _config = FerryError::Config("test".into());
        let _storage = FerryError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _state = FerryError::inconsistent(JobId::new(), "lost race");
        let _token = FerryError::InvalidPaginationToken {
            token: "x".into(),
            expected: "album:".into(),
        };
        let _cred = FerryError::Credential("bad key".into());
        let _transient = FerryError::Transient {
            message: "503".into(),
            source: None,
        };
        let _item = FerryError::Item {
            id: "p".into(),
            message: "hash".into(),
        };
        let _full = FerryError::DestinationFull {
            service: "d".into(),
        };
        let _denied = FerryError::PermissionDenied {
            message: "scope".into(),
        };
        let _timeout = FerryError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = FerryError::Internal("test".into());
    }

    #[test]
    fn adapter_type_has_four_variants() {
        use std::str::FromStr;
        for name in ["JobStore", "Exporter", "Importer", "AuthGenerator"] {
            assert_eq!(AdapterType::from_str(name).unwrap().to_string(), name);
        }
    }
}
