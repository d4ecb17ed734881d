// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded retry loop driven by a [`RetryStrategyLibrary`].
//!
//! A `Skip` strategy mapped to the error's kind wins over classification:
//! the failure is swallowed as skippable whatever its class. Otherwise fatal
//! and skippable errors stop immediately and retryable errors are re-attempted
//! for as long as the strategy mapped to the error's kind allows.

use std::future::Future;

use tracing::{debug, warn};

use ferry_core::retry::RetryStrategyLibrary;
use ferry_core::{ErrorClassifier, FailureClass, FerryError};

/// A unit of work that did not succeed under its retry policy.
#[derive(Debug)]
pub(crate) struct Failure {
    pub error: FerryError,
    pub class: FailureClass,
    /// The strategy for this error kind is `Skip`: swallow regardless of caller.
    pub skip: bool,
}

impl Failure {
    pub fn can_skip(&self) -> bool {
        self.skip || self.class == FailureClass::Skippable
    }
}

pub(crate) async fn run_with_policy<T, F, Fut>(
    library: &RetryStrategyLibrary,
    classifier: &dyn ErrorClassifier,
    label: &str,
    mut f: F,
) -> Result<T, Failure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FerryError>>,
{
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        let error = match f().await {
            Ok(value) => {
                if attempts > 1 {
                    debug!(label, attempts, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        let class = classifier.classify(&error);
        let strategy = library.strategy_for(error.root().kind());
        if strategy.can_skip() {
            debug!(label, error = %error, "skipping under skip strategy");
            return Err(Failure {
                error,
                class,
                skip: true,
            });
        }
        if class != FailureClass::Retryable {
            return Err(Failure {
                error,
                class,
                skip: false,
            });
        }
        match strategy.next_delay(attempts) {
            Some(delay) => {
                warn!(label, attempts, delay_ms = delay.as_millis() as u64, error = %error, "retrying");
                tokio::time::sleep(delay).await;
            }
            None => {
                let error = if attempts > 1 {
                    FerryError::RetriesExhausted {
                        attempts,
                        source: Box::new(error),
                    }
                } else {
                    error
                };
                return Err(Failure {
                    error,
                    class,
                    skip: false,
                });
            }
        }
    }
}

/// Run `f` until it succeeds or the policy gives up, returning the last error.
pub async fn call_with_retry<T, F, Fut>(
    library: &RetryStrategyLibrary,
    classifier: &dyn ErrorClassifier,
    label: &str,
    f: F,
) -> Result<T, FerryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FerryError>>,
{
    run_with_policy(library, classifier, label, f)
        .await
        .map_err(|failure| failure.error)
}
