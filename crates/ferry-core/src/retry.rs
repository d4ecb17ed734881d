// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry policy types.
//!
//! These are plain data so they can be loaded from configuration; the async
//! retry loop that consumes them lives in `ferry-transfer`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Upper bound on any single backoff delay.
const MAX_DELAY: Duration = Duration::from_secs(300);

/// How to re-attempt a failed unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetryStrategy {
    /// Fail on the first error.
    NoRetry,
    /// Never retry; the failure is recorded as skippable and work continues.
    Skip,
    /// Fixed delay between attempts.
    Uniform { max_attempts: u32, interval_ms: u64 },
    /// Delay grows by `multiplier` after every failed attempt.
    ExponentialBackoff {
        max_attempts: u32,
        initial_interval_ms: u64,
        multiplier: f64,
    },
}

impl RetryStrategy {
    pub fn max_attempts(&self) -> u32 {
        match self {
            RetryStrategy::NoRetry | RetryStrategy::Skip => 1,
            RetryStrategy::Uniform { max_attempts, .. }
            | RetryStrategy::ExponentialBackoff { max_attempts, .. } => (*max_attempts).max(1),
        }
    }

    /// Delay before the next attempt once `attempts_made` attempts have failed.
    ///
    /// Returns `None` when the strategy has no attempts left.
    pub fn next_delay(&self, attempts_made: u32) -> Option<Duration> {
        if attempts_made >= self.max_attempts() {
            return None;
        }
        match self {
            RetryStrategy::NoRetry | RetryStrategy::Skip => None,
            RetryStrategy::Uniform { interval_ms, .. } => Some(Duration::from_millis(*interval_ms)),
            RetryStrategy::ExponentialBackoff {
                initial_interval_ms,
                multiplier,
                ..
            } => {
                let exp = attempts_made.saturating_sub(1).min(16) as i32;
                let millis = (*initial_interval_ms as f64) * multiplier.max(1.0).powi(exp);
                Some(Duration::from_millis(millis as u64).min(MAX_DELAY))
            }
        }
    }

    /// Whether exhausting this strategy leaves the item skippable.
    pub fn can_skip(&self) -> bool {
        matches!(self, RetryStrategy::Skip)
    }
}

/// Strategy to apply to a set of error kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryMapping {
    pub kinds: Vec<ErrorKind>,
    pub strategy: RetryStrategy,
}

/// Ordered strategy lookup by error kind, with a fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryStrategyLibrary {
    #[serde(default)]
    pub mappings: Vec<RetryMapping>,
    #[serde(default = "default_strategy")]
    pub default: RetryStrategy,
}

fn default_strategy() -> RetryStrategy {
    RetryStrategy::NoRetry
}

impl RetryStrategyLibrary {
    /// First mapping that names `kind`, else the default.
    pub fn strategy_for(&self, kind: ErrorKind) -> &RetryStrategy {
        self.mappings
            .iter()
            .find(|m| m.kinds.contains(&kind))
            .map(|m| &m.strategy)
            .unwrap_or(&self.default)
    }
}

impl Default for RetryStrategyLibrary {
    fn default() -> Self {
        Self {
            mappings: vec![
                RetryMapping {
                    kinds: vec![ErrorKind::Transient, ErrorKind::Timeout],
                    strategy: RetryStrategy::ExponentialBackoff {
                        max_attempts: 5,
                        initial_interval_ms: 1_000,
                        multiplier: 2.0,
                    },
                },
                RetryMapping {
                    kinds: vec![ErrorKind::Item],
                    strategy: RetryStrategy::Skip,
                },
            ],
            default: default_strategy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_stops_after_max_attempts() {
        let s = RetryStrategy::Uniform {
            max_attempts: 3,
            interval_ms: 10,
        };
        assert_eq!(s.next_delay(1), Some(Duration::from_millis(10)));
        assert_eq!(s.next_delay(2), Some(Duration::from_millis(10)));
        assert_eq!(s.next_delay(3), None);
    }

    #[test]
    fn exponential_doubles_and_caps() {
        let s = RetryStrategy::ExponentialBackoff {
            max_attempts: 40,
            initial_interval_ms: 100,
            multiplier: 2.0,
        };
        assert_eq!(s.next_delay(1), Some(Duration::from_millis(100)));
        assert_eq!(s.next_delay(2), Some(Duration::from_millis(200)));
        assert_eq!(s.next_delay(3), Some(Duration::from_millis(400)));
        assert_eq!(s.next_delay(30), Some(MAX_DELAY));
    }

    #[test]
    fn skip_and_no_retry_never_wait() {
        assert_eq!(RetryStrategy::Skip.next_delay(1), None);
        assert_eq!(RetryStrategy::NoRetry.next_delay(1), None);
        assert!(RetryStrategy::Skip.can_skip());
        assert!(!RetryStrategy::NoRetry.can_skip());
    }

    #[test]
    fn library_falls_back_to_default() {
        let lib = RetryStrategyLibrary::default();
        assert!(matches!(
            lib.strategy_for(ErrorKind::Transient),
            RetryStrategy::ExponentialBackoff { .. }
        ));
        assert_eq!(lib.strategy_for(ErrorKind::Item), &RetryStrategy::Skip);
        assert_eq!(lib.strategy_for(ErrorKind::Storage), &RetryStrategy::NoRetry);
    }

    #[test]
    fn library_deserializes_from_tagged_json() {
        let json = r#"{
            "mappings": [{"kinds": ["transient"], "strategy": {"type": "uniform", "max_attempts": 2, "interval_ms": 5}}],
            "default": {"type": "skip"}
        }"#;
        let lib: RetryStrategyLibrary = serde_json::from_str(json).unwrap();
        assert_eq!(lib.strategy_for(ErrorKind::Transient).max_attempts(), 2);
        assert!(lib.strategy_for(ErrorKind::Internal).can_skip());
    }
}
