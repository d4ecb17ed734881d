// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry of authorization flow generators.

use std::collections::HashMap;
use std::sync::Arc;

use ferry_core::{AuthDataGenerator, AuthMode, DataVertical, FerryError};

type Key = (String, DataVertical, AuthMode);

fn key(service: &str, vertical: DataVertical, mode: AuthMode) -> Key {
    (service.to_ascii_lowercase(), vertical, mode)
}

/// Auth generators keyed by service, data vertical, and mode.
#[derive(Default)]
pub struct AuthServiceRegistry {
    generators: HashMap<Key, Arc<dyn AuthDataGenerator>>,
}

impl AuthServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `generator` for one service, vertical, and mode.
    ///
    /// Service names are case-insensitive. A later registration replaces an
    /// earlier one.
    pub fn register(
        &mut self,
        service: &str,
        vertical: DataVertical,
        mode: AuthMode,
        generator: Arc<dyn AuthDataGenerator>,
    ) {
        self.generators.insert(key(service, vertical, mode), generator);
    }

    pub fn generator(
        &self,
        service: &str,
        vertical: DataVertical,
        mode: AuthMode,
    ) -> Result<Arc<dyn AuthDataGenerator>, FerryError> {
        self.generators
            .get(&key(service, vertical, mode))
            .cloned()
            .ok_or_else(|| {
                FerryError::Config(format!(
                    "no {mode} auth generator registered for {service}/{vertical}"
                ))
            })
    }

    /// Services that can authorize `mode` for `vertical`, sorted.
    pub fn services(&self, vertical: DataVertical, mode: AuthMode) -> Vec<String> {
        let mut services: Vec<_> = self
            .generators
            .keys()
            .filter(|(_, v, m)| *v == vertical && *m == mode)
            .map(|(s, _, _)| s.clone())
            .collect();
        services.sort();
        services
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ferry_core::traits::AuthFlowConfiguration;
    use ferry_core::{AdapterType, AuthData, JobId, PluginAdapter};

    struct Static(&'static str);

    #[async_trait]
    impl PluginAdapter for Static {
        fn name(&self) -> &str {
            self.0
        }

        fn adapter_type(&self) -> AdapterType {
            AdapterType::AuthGenerator
        }
    }

    #[async_trait]
    impl AuthDataGenerator for Static {
        async fn generate_configuration(
            &self,
            callback_base_url: &str,
            _job_id: JobId,
        ) -> Result<AuthFlowConfiguration, FerryError> {
            Ok(AuthFlowConfiguration {
                auth_url: format!("{callback_base_url}/{}", self.0),
                initial_auth_data: None,
            })
        }

        async fn generate_auth_data(
            &self,
            _callback_base_url: &str,
            auth_code: &str,
            _job_id: JobId,
            _initial_auth_data: Option<&AuthData>,
            _extra: Option<&str>,
        ) -> Result<AuthData, FerryError> {
            Ok(AuthData::TokenSecret {
                token: auth_code.into(),
                secret: String::new(),
            })
        }
    }

    #[test]
    fn lookup_is_case_insensitive_and_mode_specific() {
        let mut registry = AuthServiceRegistry::new();
        registry.register("Source", DataVertical::Photos, AuthMode::Export, Arc::new(Static("src")));

        let found = registry
            .generator("SOURCE", DataVertical::Photos, AuthMode::Export)
            .unwrap();
        assert_eq!(found.name(), "src");

        let err = registry
            .generator("source", DataVertical::Photos, AuthMode::Import)
            .err()
            .unwrap();
        assert!(err.to_string().contains("no import auth generator registered for source/PHOTOS"));
    }

    #[test]
    fn services_lists_by_vertical_and_mode() {
        let mut registry = AuthServiceRegistry::new();
        registry.register("b", DataVertical::Photos, AuthMode::Import, Arc::new(Static("b")));
        registry.register("a", DataVertical::Photos, AuthMode::Import, Arc::new(Static("a")));
        registry.register("c", DataVertical::Music, AuthMode::Import, Arc::new(Static("c")));
        assert_eq!(registry.services(DataVertical::Photos, AuthMode::Import), ["a", "b"]);
        assert!(registry.services(DataVertical::Photos, AuthMode::Export).is_empty());
    }
}
