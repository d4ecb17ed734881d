// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Export and import plugin contracts.

use std::sync::Arc;

use async_trait::async_trait;

use ferry_core::models::{ContainerResource, ExportInformation, ExportResult, ImportResult};
use ferry_core::pagination::TokenPhases;
use ferry_core::traits::DefaultClassifier;
use ferry_core::{AuthData, ErrorClassifier, FerryError, JobId, PluginAdapter};

use crate::executor::IdempotentExecutor;

/// Reads one page of a user's account from a source service.
#[async_trait]
pub trait Exporter: PluginAdapter {
    /// Export the page or container described by `info`, or the root when `None`.
    async fn export(
        &self,
        job_id: JobId,
        auth: &AuthData,
        info: Option<&ExportInformation>,
    ) -> Result<ExportResult, FerryError>;

    /// The token prefixes this exporter hands out, if it paginates in phases.
    ///
    /// A resumed token must route to one of these phases.
    fn pagination_phases(&self) -> Option<TokenPhases> {
        None
    }

    /// How this provider's failures map onto retry, skip, or abort.
    fn error_classifier(&self) -> Arc<dyn ErrorClassifier> {
        Arc::new(DefaultClassifier)
    }
}

/// Writes one container of items to a destination service.
///
/// Every per-item write goes through `executor` so partial failures are
/// recorded rather than aborting the container.
#[async_trait]
pub trait Importer: PluginAdapter {
    async fn import(
        &self,
        job_id: JobId,
        executor: &IdempotentExecutor,
        auth: &AuthData,
        data: &ContainerResource,
    ) -> Result<ImportResult, FerryError>;

    fn error_classifier(&self) -> Arc<dyn ErrorClassifier> {
        Arc::new(DefaultClassifier)
    }
}
