// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails
//! at startup instead of silently falling back to a default.

use ferry_core::retry::RetryStrategyLibrary;
use serde::{Deserialize, Serialize};

/// Top-level Ferry configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FerryConfig {
    /// Job store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Worker polling and claim settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Key material settings.
    #[serde(default)]
    pub crypto: CryptoConfig,

    /// Driver loop and import settings.
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Front-end settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// SQLite job store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("ferry").join("jobs.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("ferry-jobs.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Worker claim and credential-wait configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Seconds between polls for an unclaimed job.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Seconds between checks for credentials on a claimed job.
    #[serde(default = "default_credential_poll_interval_secs")]
    pub credential_poll_interval_secs: u64,

    /// How long a claimed job may wait for credentials before timing out.
    #[serde(default = "default_credential_timeout_secs")]
    pub credential_timeout_secs: u64,

    /// Worker identity written into claimed jobs. Generated when absent.
    #[serde(default)]
    pub instance_id: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            credential_poll_interval_secs: default_credential_poll_interval_secs(),
            credential_timeout_secs: default_credential_timeout_secs(),
            instance_id: None,
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    20
}

fn default_credential_poll_interval_secs() -> u64 {
    5
}

fn default_credential_timeout_secs() -> u64 {
    600
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CryptoConfig {
    /// Modulus size of the worker's RSA keypair.
    #[serde(default = "default_rsa_key_bits")]
    pub rsa_key_bits: usize,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            rsa_key_bits: default_rsa_key_bits(),
        }
    }
}

fn default_rsa_key_bits() -> usize {
    2048
}

/// Driver loop and importer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransferConfig {
    /// Items per bulk-create call on the destination.
    #[serde(default = "default_import_batch_size")]
    pub import_batch_size: usize,

    /// Retry strategies by error kind.
    #[serde(default)]
    pub retry: RetryStrategyLibrary,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            import_batch_size: default_import_batch_size(),
            retry: RetryStrategyLibrary::default(),
        }
    }
}

fn default_import_batch_size() -> usize {
    49
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Base URL providers redirect back to after authorization.
    #[serde(default = "default_callback_base_url")]
    pub callback_base_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            callback_base_url: default_callback_base_url(),
        }
    }
}

fn default_callback_base_url() -> String {
    "http://localhost:8080".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
