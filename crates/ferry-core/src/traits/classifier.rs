// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider-supplied failure classification.

use crate::error::{FailureClass, FerryError};

/// Decides whether a provider error is retryable, skippable, or fatal.
///
/// Providers know their own error vocabulary ("not enough storage", a per-file
/// permission error); the executor and driver loop only act on the class.
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, error: &FerryError) -> FailureClass;
}

/// Classifies by error variant alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl ErrorClassifier for DefaultClassifier {
    fn classify(&self, error: &FerryError) -> FailureClass {
        error.root().class()
    }
}

impl<F> ErrorClassifier for F
where
    F: Fn(&FerryError) -> FailureClass + Send + Sync,
{
    fn classify(&self, error: &FerryError) -> FailureClass {
        self(error)
    }
}
