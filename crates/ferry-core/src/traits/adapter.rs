// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all pluggable components implement.

use async_trait::async_trait;

use crate::error::FerryError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for job stores, exporters, importers, and auth generators.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the role this adapter plays.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, FerryError> {
        Ok(HealthStatus::Healthy)
    }
}
