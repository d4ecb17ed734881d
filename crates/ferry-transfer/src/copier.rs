// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The export/import driver loop.
//!
//! Pending work is a stack of [`ExportInformation`]. After each export the
//! exported container is imported immediately; on `CONTINUE` the child
//! containers are pushed in reverse and the next page of the current phase is
//! pushed last, so pagination of a phase runs before its children. The stack
//! is persisted after every iteration and reloaded when a job restarts.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use ferry_core::models::{
    ContainerResource, ErrorDetail, ExportInformation, ExportResult, ImportStatus, ResultType,
};
use ferry_core::retry::RetryStrategyLibrary;
use ferry_core::{AuthData, FerryError, IdempotentStore, JobId, JobStore};

use crate::executor::IdempotentExecutor;
use crate::retry::call_with_retry;
use crate::traits::{Exporter, Importer};

/// What one `copy` run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopySummary {
    /// Export calls made by this run.
    pub iterations: u64,
    /// Items written per item type by this run.
    pub counts: BTreeMap<String, i64>,
    /// Keys still in a failed state when the run finished.
    pub errors: Vec<ErrorDetail>,
}

/// Drives one exporter into one importer for a job.
pub struct Copier {
    store: Arc<dyn JobStore>,
    results: Arc<dyn IdempotentStore>,
    exporter: Arc<dyn Exporter>,
    importer: Arc<dyn Importer>,
    library: RetryStrategyLibrary,
}

impl Copier {
    pub fn new(
        store: Arc<dyn JobStore>,
        results: Arc<dyn IdempotentStore>,
        exporter: Arc<dyn Exporter>,
        importer: Arc<dyn Importer>,
        library: RetryStrategyLibrary,
    ) -> Self {
        Self {
            store,
            results,
            exporter,
            importer,
            library,
        }
    }

    /// Copy everything reachable from `export_information` (or the account
    /// root) into the destination.
    ///
    /// If an earlier run of this job persisted a pending stack, that stack is
    /// resumed and `export_information` is ignored.
    pub async fn copy(
        &self,
        job_id: JobId,
        export_auth: &AuthData,
        import_auth: &AuthData,
        export_information: Option<ExportInformation>,
    ) -> Result<CopySummary, FerryError> {
        let executor = IdempotentExecutor::for_job(job_id, self.results.clone())
            .await?
            .with_retry(self.library.clone(), self.importer.error_classifier());
        let mut summary = CopySummary::default();

        let mut stack = match self.store.load_job_stack(job_id).await? {
            Some(saved) => {
                info!(job_id = %job_id, pending = saved.len(), "resuming saved transfer stack");
                for pending in &saved {
                    self.validate_resume(pending)?;
                }
                saved
            }
            None => {
                if let Some(start) = &export_information {
                    self.validate_resume(start)?;
                }
                let mut stack = Vec::new();
                let result = self
                    .iteration(
                        job_id,
                        export_auth,
                        import_auth,
                        export_information.as_ref(),
                        &executor,
                        &mut summary,
                    )
                    .await?;
                let container = export_information.and_then(|info| info.container);
                push_continuation(&mut stack, container, result);
                self.store.store_job_stack(job_id, &stack).await?;
                stack
            }
        };

        while let Some(current) = stack.pop() {
            let result = self
                .iteration(
                    job_id,
                    export_auth,
                    import_auth,
                    Some(&current),
                    &executor,
                    &mut summary,
                )
                .await?;
            push_continuation(&mut stack, current.container, result);
            self.store.store_job_stack(job_id, &stack).await?;
        }

        self.store.clear_job_stack(job_id).await?;
        summary.errors = executor.errors().await;
        info!(
            job_id = %job_id,
            iterations = summary.iterations,
            errors = summary.errors.len(),
            "copy finished"
        );
        Ok(summary)
    }

    /// A saved page token must belong to one of the exporter's phases.
    fn validate_resume(&self, info: &ExportInformation) -> Result<(), FerryError> {
        if let (Some(token), Some(phases)) = (&info.pagination, self.exporter.pagination_phases()) {
            phases.route(token)?;
        }
        Ok(())
    }

    /// Export one page, import what it returned, and commit the errors it caused.
    async fn iteration(
        &self,
        job_id: JobId,
        export_auth: &AuthData,
        import_auth: &AuthData,
        info: Option<&ExportInformation>,
        executor: &IdempotentExecutor,
        summary: &mut CopySummary,
    ) -> Result<ExportResult, FerryError> {
        summary.iterations += 1;
        debug!(
            job_id = %job_id,
            iteration = summary.iterations,
            token = info.and_then(|i| i.pagination.as_ref()).map(|t| t.as_str()),
            "copy iteration"
        );

        let exporter = self.exporter.as_ref();
        let export_classifier = exporter.error_classifier();
        let result = call_with_retry(&self.library, export_classifier.as_ref(), "export", move || {
            exporter.export(job_id, export_auth, info)
        })
        .await?;

        if let Some(container) = result.exported.as_ref().filter(|c| !c.is_empty()) {
            self.import(job_id, import_auth, container, executor, summary)
                .await?;
        }
        Ok(result)
    }

    async fn import(
        &self,
        job_id: JobId,
        import_auth: &AuthData,
        container: &ContainerResource,
        executor: &IdempotentExecutor,
        summary: &mut CopySummary,
    ) -> Result<(), FerryError> {
        let importer = self.importer.as_ref();
        let import_classifier = importer.error_classifier();
        // Item writes are retried by the executor. Only a container the
        // importer itself reports as failed is attempted again here.
        let outcome = call_with_retry(&self.library, import_classifier.as_ref(), "import", move || async move {
            match importer.import(job_id, executor, import_auth, container).await {
                Ok(result) if result.status == ImportStatus::Error => Err(FerryError::Transient {
                    message: result
                        .message
                        .unwrap_or_else(|| "importer reported an error".into()),
                    source: None,
                }),
                Ok(result) => Ok(Ok(result)),
                Err(e) => Ok(Err(e)),
            }
        })
        .await
        .and_then(|inner| inner);

        // Errors from this container go to the store in one write, even if
        // the import as a whole failed.
        let errors = executor.take_recent_errors().await;
        if !errors.is_empty() {
            warn!(job_id = %job_id, count = errors.len(), "recording item errors");
            self.store.add_errors_to_job(job_id, &errors).await?;
        }

        let result = outcome?;
        if !result.counts.is_empty() {
            self.store.add_counts(job_id, &result.counts).await?;
            for (item_type, count) in &result.counts {
                *summary.counts.entry(item_type.clone()).or_insert(0) += count;
            }
        }
        if let Some(bytes) = result.bytes {
            debug!(job_id = %job_id, bytes, "container imported");
        }
        Ok(())
    }
}

/// Push children in reverse, then the next page, so the page pops first.
fn push_continuation(
    stack: &mut Vec<ExportInformation>,
    current: Option<ContainerResource>,
    result: ExportResult,
) {
    if result.result_type != ResultType::Continue {
        return;
    }
    let Some(continuation) = result.continuation else {
        return;
    };
    for child in continuation.containers.into_iter().rev() {
        stack.push(ExportInformation::container(child));
    }
    if let Some(token) = continuation.pagination {
        stack.push(ExportInformation::page(token, current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use ferry_core::models::{
        ContinuationData, GenericItem, ImportResult, ItemsContainer, PaginationToken,
    };
    use ferry_core::pagination::TokenPhases;
    use ferry_core::retry::{RetryMapping, RetryStrategy};
    use ferry_core::{AdapterType, ErrorKind, PluginAdapter};
    use ferry_storage::MemoryJobStore;

    fn auth() -> AuthData {
        AuthData::TokensAndUrl {
            access_token: "t".into(),
            refresh_token: None,
            token_server_url: None,
        }
    }

    fn items(ids: &[&str]) -> ContainerResource {
        ContainerResource::Items(ItemsContainer {
            items: ids
                .iter()
                .map(|id| GenericItem {
                    id: id.to_string(),
                    title: format!("item {id}"),
                    parent_id: None,
                    payload: serde_json::Value::Null,
                })
                .collect(),
        })
    }

    /// Serves scripted responses keyed by the incoming token or container id.
    struct ScriptedExporter {
        responses: HashMap<String, ExportResult>,
        calls: Mutex<Vec<String>>,
        phases: Option<TokenPhases>,
    }

    impl ScriptedExporter {
        fn new(responses: Vec<(&str, ExportResult)>) -> Self {
            Self {
                responses: responses
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
                calls: Mutex::new(Vec::new()),
                phases: None,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn request_key(info: Option<&ExportInformation>) -> String {
        match info {
            None => "root".into(),
            Some(ExportInformation {
                pagination: Some(token),
                ..
            }) => token.to_string(),
            Some(ExportInformation {
                container: Some(ContainerResource::IdOnly(c)),
                ..
            }) => c.id.clone(),
            Some(_) => "other".into(),
        }
    }

    #[async_trait]
    impl PluginAdapter for ScriptedExporter {
        fn name(&self) -> &str {
            "scripted"
        }

        fn adapter_type(&self) -> AdapterType {
            AdapterType::Exporter
        }
    }

    #[async_trait]
    impl Exporter for ScriptedExporter {
        async fn export(
            &self,
            _job_id: JobId,
            _auth: &AuthData,
            info: Option<&ExportInformation>,
        ) -> Result<ExportResult, FerryError> {
            let key = request_key(info);
            self.calls.lock().unwrap().push(key.clone());
            self.responses
                .get(&key)
                .cloned()
                .ok_or_else(|| FerryError::Internal(format!("unexpected request {key}")))
        }

        fn pagination_phases(&self) -> Option<TokenPhases> {
            self.phases
        }
    }

    /// Imports items through the executor, failing any id in `fail`.
    #[derive(Default)]
    struct RecordingImporter {
        written: Mutex<Vec<String>>,
        fail: Vec<String>,
        fatal: Vec<String>,
        /// Ids whose writes always fail transiently, through `execute_or_throw`.
        unavailable: Vec<String>,
        attempts: AtomicU32,
    }

    #[async_trait]
    impl PluginAdapter for RecordingImporter {
        fn name(&self) -> &str {
            "recording"
        }

        fn adapter_type(&self) -> AdapterType {
            AdapterType::Importer
        }
    }

    #[async_trait]
    impl Importer for RecordingImporter {
        async fn import(
            &self,
            _job_id: JobId,
            executor: &IdempotentExecutor,
            _auth: &AuthData,
            data: &ContainerResource,
        ) -> Result<ImportResult, FerryError> {
            let ContainerResource::Items(container) = data else {
                return Ok(ImportResult::ok());
            };
            let mut result = ImportResult::ok();
            for item in &container.items {
                let key = format!("root-{}", item.id);
                if self.unavailable.contains(&item.id) {
                    let attempts = &self.attempts;
                    executor
                        .execute_or_throw::<String, _, _>(&key, &item.title, move || async move {
                            attempts.fetch_add(1, Ordering::SeqCst);
                            Err(FerryError::Transient {
                                message: "503".into(),
                                source: None,
                            })
                        })
                        .await?;
                    continue;
                }
                let id = item.id.clone();
                let written = &self.written;
                let fail = self.fail.contains(&id);
                let fatal = self.fatal.contains(&id);
                let outcome: Option<String> = executor
                    .execute_and_swallow(&key, &item.title, move || {
                        let id = id.clone();
                        async move {
                            if fatal {
                                return Err(FerryError::DestinationFull {
                                    service: "dest".into(),
                                });
                            }
                            if fail {
                                return Err(FerryError::Item {
                                    id,
                                    message: "rejected".into(),
                                });
                            }
                            written.lock().unwrap().push(id.clone());
                            Ok(id)
                        }
                    })
                    .await?;
                if outcome.is_some() {
                    result = result.with_count("ITEMS", 1);
                }
            }
            Ok(result)
        }
    }

    fn copier(
        store: Arc<MemoryJobStore>,
        exporter: Arc<ScriptedExporter>,
        importer: Arc<RecordingImporter>,
    ) -> Copier {
        Copier::new(
            store.clone(),
            store,
            exporter,
            importer,
            RetryStrategyLibrary::default(),
        )
    }

    fn page(exported: &[&str], next: Option<&str>) -> ExportResult {
        ExportResult::with_continuation(
            Some(items(exported)),
            ContinuationData::new(next.map(PaginationToken::new)),
        )
    }

    #[tokio::test]
    async fn n_pages_take_n_export_calls() {
        let exporter = Arc::new(ScriptedExporter::new(vec![
            ("root", page(&["a", "b"], Some("page:2"))),
            ("page:2", page(&["c"], Some("page:3"))),
            ("page:3", page(&["d", "e"], None)),
        ]));
        let importer = Arc::new(RecordingImporter::default());
        let store = Arc::new(MemoryJobStore::new());
        let job_id = JobId::new();

        let summary = copier(store.clone(), exporter.clone(), importer.clone())
            .copy(job_id, &auth(), &auth(), None)
            .await
            .unwrap();

        assert_eq!(exporter.calls().len(), 3);
        assert_eq!(summary.iterations, 3);
        assert_eq!(*importer.written.lock().unwrap(), ["a", "b", "c", "d", "e"]);
        assert_eq!(summary.counts["ITEMS"], 5);
        assert_eq!(store.counts_for_job(job_id).await.unwrap()["ITEMS"], 5);
        assert!(store.load_job_stack(job_id).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failing_item_is_attempted_only_as_often_as_its_strategy_allows() {
        let exporter = Arc::new(ScriptedExporter::new(vec![("root", page(&["album"], None))]));
        let importer = Arc::new(RecordingImporter {
            unavailable: vec!["album".into()],
            ..RecordingImporter::default()
        });
        let store = Arc::new(MemoryJobStore::new());
        let job_id = JobId::new();
        let library = RetryStrategyLibrary {
            mappings: vec![RetryMapping {
                kinds: vec![ErrorKind::Transient],
                strategy: RetryStrategy::Uniform {
                    max_attempts: 3,
                    interval_ms: 10,
                },
            }],
            default: RetryStrategy::NoRetry,
        };

        let err = Copier::new(store.clone(), store.clone(), exporter, importer.clone(), library)
            .copy(job_id, &auth(), &auth(), None)
            .await
            .unwrap_err();

        assert_eq!(importer.attempts.load(Ordering::SeqCst), 3);
        match err {
            FerryError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, FerryError::Transient { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let errors = store.errors_for_job(job_id).await.unwrap();
        let ids: Vec<_> = errors.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["root-album"]);
    }

    #[tokio::test]
    async fn empty_page_still_advances_pagination() {
        let exporter = Arc::new(ScriptedExporter::new(vec![
            ("root", page(&[], Some("page:2"))),
            ("page:2", ExportResult::with_continuation(None, ContinuationData::new(Some(PaginationToken::new("page:3"))))),
            ("page:3", page(&["z"], None)),
        ]));
        let importer = Arc::new(RecordingImporter::default());
        let store = Arc::new(MemoryJobStore::new());

        copier(store, exporter.clone(), importer.clone())
            .copy(JobId::new(), &auth(), &auth(), None)
            .await
            .unwrap();
        assert_eq!(exporter.calls(), ["root", "page:2", "page:3"]);
        assert_eq!(*importer.written.lock().unwrap(), ["z"]);
    }

    #[tokio::test]
    async fn next_page_runs_before_children() {
        let mut root = ContinuationData::new(Some(PaginationToken::new("page:2")));
        root.add_container(ContainerResource::id_only("child-a"));
        root.add_container(ContainerResource::id_only("child-b"));
        let exporter = Arc::new(ScriptedExporter::new(vec![
            ("root", ExportResult::with_continuation(None, root)),
            ("page:2", ExportResult::end(None)),
            ("child-a", page(&["a1"], None)),
            ("child-b", page(&["b1"], None)),
        ]));
        let importer = Arc::new(RecordingImporter::default());
        let store = Arc::new(MemoryJobStore::new());

        copier(store, exporter.clone(), importer.clone())
            .copy(JobId::new(), &auth(), &auth(), None)
            .await
            .unwrap();
        assert_eq!(exporter.calls(), ["root", "page:2", "child-a", "child-b"]);
    }

    #[tokio::test]
    async fn item_errors_are_committed_and_copy_continues() {
        let exporter = Arc::new(ScriptedExporter::new(vec![(
            "root",
            page(&["1", "2", "3"], None),
        )]));
        let importer = Arc::new(RecordingImporter {
            fail: vec!["2".into()],
            ..Default::default()
        });
        let store = Arc::new(MemoryJobStore::new());
        let job_id = JobId::new();

        let summary = copier(store.clone(), exporter, importer.clone())
            .copy(job_id, &auth(), &auth(), None)
            .await
            .unwrap();

        assert_eq!(*importer.written.lock().unwrap(), ["1", "3"]);
        let errors = store.errors_for_job(job_id).await.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].id, "root-2");
        assert!(errors[0].can_skip);
        assert_eq!(summary.errors.len(), 1);
    }

    #[tokio::test]
    async fn foreign_resume_token_is_rejected() {
        let mut scripted = ScriptedExporter::new(vec![]);
        scripted.phases = Some(TokenPhases::new(&["album:", "media:"]).unwrap());
        let exporter = Arc::new(scripted);
        let store = Arc::new(MemoryJobStore::new());

        let err = copier(store, exporter.clone(), Arc::new(RecordingImporter::default()))
            .copy(
                JobId::new(),
                &auth(),
                &auth(),
                Some(ExportInformation::page(PaginationToken::new("track:7"), None)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FerryError::InvalidPaginationToken { .. }));
        assert!(exporter.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_run_resumes_from_saved_stack() {
        let store = Arc::new(MemoryJobStore::new());
        let job_id = JobId::new();
        let script = || {
            vec![
                ("root", page(&["a"], Some("page:2"))),
                ("page:2", page(&["b", "boom"], Some("page:3"))),
                ("page:3", page(&["c"], None)),
            ]
        };

        let exporter = Arc::new(ScriptedExporter::new(script()));
        let failing = Arc::new(RecordingImporter {
            fatal: vec!["boom".into()],
            ..Default::default()
        });
        let err = copier(store.clone(), exporter, failing.clone())
            .copy(job_id, &auth(), &auth(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FerryError::DestinationFull { .. }));
        assert_eq!(*failing.written.lock().unwrap(), ["a", "b"]);
        let saved = store.load_job_stack(job_id).await.unwrap().unwrap();
        assert_eq!(saved.len(), 1);

        let exporter = Arc::new(ScriptedExporter::new(script()));
        let healthy = Arc::new(RecordingImporter::default());
        copier(store.clone(), exporter.clone(), healthy.clone())
            .copy(job_id, &auth(), &auth(), None)
            .await
            .unwrap();
        assert_eq!(exporter.calls(), ["page:2", "page:3"]);
        // "b" was cached by the first run and is not written again.
        assert_eq!(*healthy.written.lock().unwrap(), ["boom", "c"]);
    }
}
