// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry of compiled-in exporter and importer factories.
//!
//! Factories are registered explicitly at process start, keyed by service
//! name and data vertical. Service names are matched case-insensitively.

use std::collections::HashMap;
use std::sync::Arc;

use ferry_core::{DataVertical, FerryError};

use crate::traits::{Exporter, Importer};

/// Builds an exporter for one (service, vertical) pair.
pub trait ExporterFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn Exporter>, FerryError>;
}

/// Builds an importer for one (service, vertical) pair.
pub trait ImporterFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn Importer>, FerryError>;
}

impl<F> ExporterFactory for F
where
    F: Fn() -> Result<Arc<dyn Exporter>, FerryError> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn Exporter>, FerryError> {
        self()
    }
}

impl<F> ImporterFactory for F
where
    F: Fn() -> Result<Arc<dyn Importer>, FerryError> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn Importer>, FerryError> {
        self()
    }
}

type Key = (String, DataVertical);

fn key(service: &str, vertical: DataVertical) -> Key {
    (service.to_ascii_lowercase(), vertical)
}

/// Exporter and importer factories keyed by (service, vertical).
#[derive(Default)]
pub struct ExtensionRegistry {
    exporters: HashMap<Key, Box<dyn ExporterFactory>>,
    importers: HashMap<Key, Box<dyn ImporterFactory>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an exporter factory, replacing any earlier one for the same key.
    pub fn register_exporter(
        &mut self,
        service: &str,
        vertical: DataVertical,
        factory: impl ExporterFactory + 'static,
    ) {
        self.exporters
            .insert(key(service, vertical), Box::new(factory));
    }

    pub fn register_importer(
        &mut self,
        service: &str,
        vertical: DataVertical,
        factory: impl ImporterFactory + 'static,
    ) {
        self.importers
            .insert(key(service, vertical), Box::new(factory));
    }

    pub fn exporter(
        &self,
        service: &str,
        vertical: DataVertical,
    ) -> Result<Arc<dyn Exporter>, FerryError> {
        self.exporters
            .get(&key(service, vertical))
            .ok_or_else(|| {
                FerryError::Config(format!("no exporter registered for {service}/{vertical}"))
            })?
            .create()
    }

    pub fn importer(
        &self,
        service: &str,
        vertical: DataVertical,
    ) -> Result<Arc<dyn Importer>, FerryError> {
        self.importers
            .get(&key(service, vertical))
            .ok_or_else(|| {
                FerryError::Config(format!("no importer registered for {service}/{vertical}"))
            })?
            .create()
    }

    /// Whether no exporter or importer has been registered.
    pub fn is_empty(&self) -> bool {
        self.exporters.is_empty() && self.importers.is_empty()
    }

    /// Whether a job from `export` to `import` for `vertical` can run here.
    pub fn supports(&self, export: &str, import: &str, vertical: DataVertical) -> bool {
        self.exporters.contains_key(&key(export, vertical))
            && self.importers.contains_key(&key(import, vertical))
    }

    /// Sorted service names that can export `vertical`.
    pub fn export_services(&self, vertical: DataVertical) -> Vec<String> {
        let mut services: Vec<_> = self
            .exporters
            .keys()
            .filter(|(_, v)| *v == vertical)
            .map(|(s, _)| s.clone())
            .collect();
        services.sort();
        services
    }

    /// Sorted service names that can import `vertical`.
    pub fn import_services(&self, vertical: DataVertical) -> Vec<String> {
        let mut services: Vec<_> = self
            .importers
            .keys()
            .filter(|(_, v)| *v == vertical)
            .map(|(s, _)| s.clone())
            .collect();
        services.sort();
        services
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("exporters", &self.exporters.len())
            .field("importers", &self.importers.len())
            .finish()
    }
}
