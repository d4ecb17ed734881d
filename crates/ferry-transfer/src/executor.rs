// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-job idempotent execution of destination-side writes.
//!
//! Every write is identified by a caller-chosen idempotent key. A key that has
//! already succeeded in this job returns its cached value without running the
//! work again; successes are persisted through an [`IdempotentStore`] so a
//! re-run job after a crash does not recreate destination resources. Keys
//! must be stable across retries, e.g. `{albumId}-{photoId}` built from
//! source-side ids.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use ferry_core::models::ErrorDetail;
use ferry_core::retry::{RetryStrategy, RetryStrategyLibrary};
use ferry_core::traits::DefaultClassifier;
use ferry_core::{ErrorClassifier, FailureClass, FerryError, IdempotentStore, JobId};

use crate::retry::{Failure, run_with_policy};

/// Dedup, retry, and error collection for one job's imports.
pub struct IdempotentExecutor {
    job_id: JobId,
    store: Arc<dyn IdempotentStore>,
    library: RetryStrategyLibrary,
    classifier: Arc<dyn ErrorClassifier>,
    /// Cached successes as JSON, keyed by idempotent key.
    known: Mutex<HashMap<String, String>>,
    /// Latest failure per key; cleared when the key later succeeds.
    errors: Mutex<HashMap<String, ErrorDetail>>,
    /// Failures recorded since the last [`IdempotentExecutor::take_recent_errors`].
    recent: Mutex<Vec<ErrorDetail>>,
}

impl IdempotentExecutor {
    /// Create an executor for `job_id`, loading any results persisted by an
    /// earlier run of the same job. Each unit of work runs once.
    pub async fn for_job(
        job_id: JobId,
        store: Arc<dyn IdempotentStore>,
    ) -> Result<Self, FerryError> {
        let known = store.load_results(job_id).await?;
        if !known.is_empty() {
            debug!(job_id = %job_id, cached = known.len(), "resuming with cached import results");
        }
        Ok(Self {
            job_id,
            store,
            library: RetryStrategyLibrary {
                mappings: Vec::new(),
                default: RetryStrategy::NoRetry,
            },
            classifier: Arc::new(DefaultClassifier),
            known: Mutex::new(known),
            errors: Mutex::new(HashMap::new()),
            recent: Mutex::new(Vec::new()),
        })
    }

    /// Re-attempt failed work under `library`, classifying with `classifier`.
    pub fn with_retry(
        mut self,
        library: RetryStrategyLibrary,
        classifier: Arc<dyn ErrorClassifier>,
    ) -> Self {
        self.library = library;
        self.classifier = classifier;
        self
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Run `work` under `key`, collecting non-fatal failures.
    ///
    /// Returns `Ok(None)` when the work failed with a retryable or skippable
    /// error (recorded against the job), and `Err` only for fatal errors.
    pub async fn execute_and_swallow<T, F, Fut>(
        &self,
        key: &str,
        name: &str,
        work: F,
    ) -> Result<Option<T>, FerryError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FerryError>>,
    {
        match self.run(key, name, work).await? {
            Ok(value) => Ok(Some(value)),
            Err(failure) if failure.skip || failure.class != FailureClass::Fatal => {
                Ok(None)
            }
            Err(failure) => Err(failure.error),
        }
    }

    /// Run `work` under `key`, propagating every failure.
    ///
    /// Used where a failure must stop dependent work, such as creating the
    /// album its photos go into. Only a `Skip` retry strategy swallows here.
    pub async fn execute_or_throw<T, F, Fut>(
        &self,
        key: &str,
        name: &str,
        work: F,
    ) -> Result<Option<T>, FerryError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FerryError>>,
    {
        match self.run(key, name, work).await? {
            Ok(value) => Ok(Some(value)),
            Err(failure) if failure.skip => Ok(None),
            Err(failure) => Err(failure.error),
        }
    }

    /// The cached success for `key`, if it has one.
    pub async fn get_cached_value<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, FerryError> {
        let known = self.known.lock().await;
        known
            .get(key)
            .map(|json| serde_json::from_str(json).map_err(FerryError::from))
            .transpose()
    }

    pub async fn is_key_cached(&self, key: &str) -> bool {
        self.known.lock().await.contains_key(key)
    }

    /// Every key currently in a failed state.
    pub async fn errors(&self) -> Vec<ErrorDetail> {
        let mut errors: Vec<_> = self.errors.lock().await.values().cloned().collect();
        errors.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then(a.id.cmp(&b.id)));
        errors
    }

    /// Drain failures recorded since the last call, for one batched write.
    pub async fn take_recent_errors(&self) -> Vec<ErrorDetail> {
        std::mem::take(&mut *self.recent.lock().await)
    }

    /// Cached lookup, then the retry loop, then bookkeeping.
    ///
    /// The outer `Result` carries storage failures; the inner one the outcome
    /// of the work itself.
    async fn run<T, F, Fut>(
        &self,
        key: &str,
        name: &str,
        work: F,
    ) -> Result<Result<T, Failure>, FerryError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FerryError>>,
    {
        if let Some(value) = self.get_cached_value(key).await? {
            debug!(job_id = %self.job_id, key, "idempotent key already succeeded");
            return Ok(Ok(value));
        }

        match run_with_policy(&self.library, self.classifier.as_ref(), name, work).await {
            Ok(value) => {
                let json = serde_json::to_string(&value)?;
                self.store.put_result(self.job_id, key, &json).await?;
                self.known.lock().await.insert(key.to_string(), json);
                self.errors.lock().await.remove(key);
                Ok(Ok(value))
            }
            Err(failure) => {
                let detail = ErrorDetail::from_error(key, name, &failure.error, failure.can_skip());
                warn!(
                    job_id = %self.job_id,
                    key,
                    name,
                    class = %failure.class,
                    can_skip = detail.can_skip,
                    error = %failure.error,
                    "import item failed"
                );
                self.errors
                    .lock()
                    .await
                    .insert(key.to_string(), detail.clone());
                let mut recent = self.recent.lock().await;
                recent.retain(|d| d.id != key);
                recent.push(detail);
                Ok(Err(failure))
            }
        }
    }
}

impl std::fmt::Debug for IdempotentExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotentExecutor")
            .field("job_id", &self.job_id)
            .field("library", &self.library)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use ferry_core::retry::RetryMapping;
    use ferry_core::ErrorKind;
    use ferry_storage::MemoryJobStore;
    use tracing_test::traced_test;

    async fn executor(store: Arc<MemoryJobStore>, job_id: JobId) -> IdempotentExecutor {
        IdempotentExecutor::for_job(job_id, store).await.unwrap()
    }

    fn item_error(id: &str) -> FerryError {
        FerryError::Item {
            id: id.into(),
            message: "hash mismatch".into(),
        }
    }

    #[tokio::test]
    async fn same_key_runs_once_and_returns_same_value() {
        let store = Arc::new(MemoryJobStore::new());
        let exec = executor(store, JobId::new()).await;
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let first: Option<String> = exec
            .execute_and_swallow("root-p1", "photo.jpg", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("dest-1".to_string())
            })
            .await
            .unwrap();
        let second: Option<String> = exec
            .execute_and_swallow("root-p1", "photo.jpg", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("dest-2".to_string())
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("dest-1"));
    }

    #[tokio::test]
    async fn cached_results_survive_a_new_executor() {
        let store = Arc::new(MemoryJobStore::new());
        let job_id = JobId::new();
        let exec = executor(store.clone(), job_id).await;
        exec.execute_or_throw("album-1", "Holiday", || async { Ok("dest-album".to_string()) })
            .await
            .unwrap();
        drop(exec);

        let resumed = executor(store, job_id).await;
        assert!(resumed.is_key_cached("album-1").await);
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let value: Option<String> = resumed
            .execute_or_throw("album-1", "Holiday", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("duplicate".to_string())
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(value.as_deref(), Some("dest-album"));
    }

    #[tokio::test]
    #[traced_test]
    async fn skippable_failure_in_batch_is_collected() {
        let store = Arc::new(MemoryJobStore::new());
        let exec = executor(store, JobId::new()).await;

        for id in ["p1", "p2", "p3"] {
            let key = format!("root-{id}");
            let result: Option<String> = exec
                .execute_and_swallow(&key, id, move || async move {
                    if id == "p2" {
                        Err(item_error(id))
                    } else {
                        Ok(format!("dest-{id}"))
                    }
                })
                .await
                .unwrap();
            assert_eq!(result.is_some(), id != "p2");
        }

        assert!(exec.is_key_cached("root-p1").await);
        assert!(!exec.is_key_cached("root-p2").await);
        assert!(exec.is_key_cached("root-p3").await);
        let errors = exec.errors().await;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].id, "root-p2");
        assert!(errors[0].can_skip);
        assert_eq!(errors[0].kind, ErrorKind::Item);
        assert!(logs_contain("import item failed"));
    }

    #[tokio::test]
    async fn fatal_errors_propagate_from_swallowing_entry_point() {
        let store = Arc::new(MemoryJobStore::new());
        let exec = executor(store, JobId::new()).await;
        let err = exec
            .execute_and_swallow::<String, _, _>("root-p1", "p1", || async {
                Err(FerryError::DestinationFull {
                    service: "dest".into(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FerryError::DestinationFull { .. }));
        assert_eq!(exec.errors().await.len(), 1);
    }

    #[tokio::test]
    async fn execute_or_throw_propagates_skippable_errors() {
        let store = Arc::new(MemoryJobStore::new());
        let exec = executor(store, JobId::new()).await;
        let err = exec
            .execute_or_throw::<String, _, _>("album-1", "Holiday", || async {
                Err(item_error("album-1"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FerryError::Item { .. }));
    }

    #[tokio::test]
    async fn later_success_clears_error() {
        let store = Arc::new(MemoryJobStore::new());
        let exec = executor(store, JobId::new()).await;
        let _: Option<String> = exec
            .execute_and_swallow("root-p1", "p1", || async { Err(item_error("p1")) })
            .await
            .unwrap();
        assert_eq!(exec.errors().await.len(), 1);
        let _: Option<String> = exec
            .execute_and_swallow("root-p1", "p1", || async { Ok("ok".to_string()) })
            .await
            .unwrap();
        assert!(exec.errors().await.is_empty());
    }

    #[tokio::test]
    async fn recent_errors_drain_once() {
        let store = Arc::new(MemoryJobStore::new());
        let exec = executor(store, JobId::new()).await;
        for key in ["a", "b"] {
            let _: Option<String> = exec
                .execute_and_swallow(key, key, || async { Err(item_error("x")) })
                .await
                .unwrap();
        }
        assert_eq!(exec.take_recent_errors().await.len(), 2);
        assert!(exec.take_recent_errors().await.is_empty());
        assert_eq!(exec.errors().await.len(), 2);
    }

    #[tokio::test]
    async fn skip_strategy_swallows_in_both_entry_points() {
        let store = Arc::new(MemoryJobStore::new());
        let exec = executor(store, JobId::new()).await.with_retry(
            RetryStrategyLibrary {
                mappings: vec![],
                default: RetryStrategy::Skip,
            },
            Arc::new(DefaultClassifier),
        );
        let swallowed: Option<String> = exec
            .execute_or_throw("album-1", "Holiday", || async {
                Err(FerryError::Internal("boom".into()))
            })
            .await
            .unwrap();
        assert!(swallowed.is_none());
        assert!(exec.errors().await[0].can_skip);
    }

    #[tokio::test]
    async fn skip_mapping_swallows_fatal_kinds() {
        let store = Arc::new(MemoryJobStore::new());
        let exec = executor(store, JobId::new()).await.with_retry(
            RetryStrategyLibrary {
                mappings: vec![RetryMapping {
                    kinds: vec![ErrorKind::PermissionDenied],
                    strategy: RetryStrategy::Skip,
                }],
                default: RetryStrategy::NoRetry,
            },
            Arc::new(DefaultClassifier),
        );
        let denied = || async {
            Err::<String, _>(FerryError::PermissionDenied {
                message: "read-only album".into(),
            })
        };

        let swallowed = exec
            .execute_and_swallow("root-file1", "file1", denied)
            .await
            .unwrap();
        assert!(swallowed.is_none());
        let thrown = exec
            .execute_or_throw("album-1", "Holiday", denied)
            .await
            .unwrap();
        assert!(thrown.is_none());

        let errors = exec.errors().await;
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.can_skip));
        assert!(errors.iter().all(|e| e.kind == ErrorKind::PermissionDenied));
    }

    #[tokio::test]
    async fn repeated_failures_of_one_key_are_drained_once() {
        let store = Arc::new(MemoryJobStore::new());
        let exec = executor(store, JobId::new()).await;
        for message in ["first", "second"] {
            let _: Option<String> = exec
                .execute_and_swallow("root-p1", "p1", move || async move {
                    Err(FerryError::Item {
                        id: "p1".into(),
                        message: message.into(),
                    })
                })
                .await
                .unwrap();
        }

        let recent = exec.take_recent_errors().await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "root-p1");
        assert!(recent[0].exception.contains("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn retrying_executor_reattempts_transient_failures() {
        let store = Arc::new(MemoryJobStore::new());
        let exec = executor(store, JobId::new()).await.with_retry(
            RetryStrategyLibrary {
                mappings: vec![RetryMapping {
                    kinds: vec![ErrorKind::Transient],
                    strategy: RetryStrategy::Uniform {
                        max_attempts: 3,
                        interval_ms: 100,
                    },
                }],
                default: RetryStrategy::NoRetry,
            },
            Arc::new(|e: &FerryError| e.root().class()),
        );
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let value: Option<u32> = exec
            .execute_and_swallow("root-p1", "p1", move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(FerryError::Transient {
                        message: "502".into(),
                        source: None,
                    })
                } else {
                    Ok(n)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, Some(2));
        assert!(exec.errors().await.is_empty());
    }
}
