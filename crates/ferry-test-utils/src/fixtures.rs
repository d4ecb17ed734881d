// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixture providers over flat item pages.

use std::sync::Mutex;

use async_trait::async_trait;

use ferry_core::models::{
    ContainerResource, ContinuationData, ExportInformation, ExportResult, GenericItem,
    ImportResult, ItemsContainer, PaginationToken,
};
use ferry_core::pagination::{TokenPhases, expect_prefix};
use ferry_core::traits::AuthFlowConfiguration;
use ferry_core::{AdapterType, AuthData, AuthDataGenerator, FerryError, JobId, PluginAdapter};
use ferry_transfer::{Exporter, IdempotentExecutor, Importer};

const PAGE_PREFIX: &str = "page:";
const PHASES: &[&str] = &[PAGE_PREFIX];

/// Auth data produced by [`StaticAuthGenerator`] for `code`.
pub fn fixture_auth(code: &str) -> AuthData {
    AuthData::TokensAndUrl {
        access_token: format!("access-{code}"),
        refresh_token: None,
        token_server_url: None,
    }
}

fn item(id: &str) -> GenericItem {
    GenericItem {
        id: id.to_string(),
        title: format!("item {id}"),
        parent_id: None,
        payload: serde_json::Value::Null,
    }
}

/// Serves fixed pages of items with `page:{n}` tokens.
pub struct FixtureExporter {
    name: String,
    pages: Vec<Vec<String>>,
    calls: Mutex<u64>,
}

impl FixtureExporter {
    pub fn new(name: impl Into<String>, pages: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            pages,
            calls: Mutex::new(0),
        }
    }

    /// Export calls served so far.
    pub fn calls(&self) -> u64 {
        *self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PluginAdapter for FixtureExporter {
    fn name(&self) -> &str {
        &self.name
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Exporter
    }
}

#[async_trait]
impl Exporter for FixtureExporter {
    async fn export(
        &self,
        _job_id: JobId,
        _auth: &AuthData,
        info: Option<&ExportInformation>,
    ) -> Result<ExportResult, FerryError> {
        *self.calls.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        let page = match info.and_then(|i| i.pagination.as_ref()) {
            Some(token) => expect_prefix(token, PAGE_PREFIX)?
                .unwrap_or("0")
                .parse::<usize>()
                .map_err(|_| FerryError::InvalidPaginationToken {
                    token: token.to_string(),
                    expected: PAGE_PREFIX.to_string(),
                })?,
            None => 0,
        };
        let items = self
            .pages
            .get(page)
            .map(|ids| ids.iter().map(|id| item(id)).collect())
            .unwrap_or_default();
        let next = (page + 1 < self.pages.len())
            .then(|| PaginationToken::with_prefix(PAGE_PREFIX, Some(&(page + 1).to_string())));
        Ok(ExportResult::with_continuation(
            Some(ContainerResource::Items(ItemsContainer { items })),
            ContinuationData::new(next),
        ))
    }

    fn pagination_phases(&self) -> Option<TokenPhases> {
        TokenPhases::new(PHASES).ok()
    }
}

/// Records imported item ids; ids listed in `reject` fail with item errors.
pub struct FixtureImporter {
    name: String,
    reject: Vec<String>,
    imported: Mutex<Vec<String>>,
}

impl FixtureImporter {
    pub fn new(name: impl Into<String>, reject: Vec<String>) -> Self {
        Self {
            name: name.into(),
            reject,
            imported: Mutex::new(Vec::new()),
        }
    }

    /// Ids written to the destination, in order.
    pub fn imported(&self) -> Vec<String> {
        self.imported.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PluginAdapter for FixtureImporter {
    fn name(&self) -> &str {
        &self.name
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Importer
    }
}

#[async_trait]
impl Importer for FixtureImporter {
    async fn import(
        &self,
        _job_id: JobId,
        executor: &IdempotentExecutor,
        _auth: &AuthData,
        data: &ContainerResource,
    ) -> Result<ImportResult, FerryError> {
        let ContainerResource::Items(container) = data else {
            return Err(FerryError::Internal(format!("{} only imports items", self.name)));
        };
        let reject = &self.reject;
        let imported = &self.imported;
        let mut result = ImportResult::ok();
        for item in &container.items {
            let written: Option<String> = executor
                .execute_and_swallow(&item.id, &item.title, move || async move {
                    if reject.contains(&item.id) {
                        return Err(FerryError::Item {
                            id: item.id.clone(),
                            message: "rejected by fixture".into(),
                        });
                    }
                    imported
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .push(item.id.clone());
                    Ok(format!("dest-{}", item.id))
                })
                .await?;
            if written.is_some() {
                result = result.with_count("ITEMS", 1);
            }
        }
        Ok(result)
    }
}

/// Auth flow with no redirect state: the callback code becomes the token.
pub struct StaticAuthGenerator {
    name: String,
}

impl StaticAuthGenerator {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl PluginAdapter for StaticAuthGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::AuthGenerator
    }
}

#[async_trait]
impl AuthDataGenerator for StaticAuthGenerator {
    async fn generate_configuration(
        &self,
        callback_base_url: &str,
        job_id: JobId,
    ) -> Result<AuthFlowConfiguration, FerryError> {
        Ok(AuthFlowConfiguration {
            auth_url: format!("{callback_base_url}/{}?job={job_id}", self.name),
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
        Ok(fixture_auth(auth_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exporter_pages_through_fixture() {
        let exporter = FixtureExporter::new(
            "src",
            vec![vec!["a".into()], vec!["b".into(), "c".into()]],
        );
        let first = exporter.export(JobId::new(), &fixture_auth("x"), None).await.unwrap();
        let token = first.continuation.unwrap().pagination.unwrap();
        assert_eq!(token.as_str(), "page:1");

        let info = ExportInformation::page(token, None);
        let second = exporter
            .export(JobId::new(), &fixture_auth("x"), Some(&info))
            .await
            .unwrap();
        assert!(second.continuation.is_none());
        assert_eq!(exporter.calls(), 2);
    }
}
