// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for Ferry's pluggable collaborators.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod auth;
pub mod classifier;
pub mod job_store;

pub use adapter::PluginAdapter;
pub use auth::{AuthDataGenerator, AuthFlowConfiguration};
pub use classifier::{DefaultClassifier, ErrorClassifier};
pub use job_store::{IdempotentStore, JobStore};
