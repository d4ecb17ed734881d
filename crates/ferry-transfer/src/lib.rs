// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transfer engine for Ferry.
//!
//! The [`copier::Copier`] drives an [`Exporter`] page by page, hands every
//! exported container to an [`Importer`], and wraps each destination-side
//! write in an [`IdempotentExecutor`] so a crashed or retried job never
//! duplicates work the destination has already seen.

pub mod copier;
pub mod executor;
pub mod media;
pub mod registry;
pub mod retry;
pub mod traits;

pub use copier::Copier;
pub use executor::IdempotentExecutor;
pub use registry::ExtensionRegistry;
pub use retry::call_with_retry;
pub use traits::{Exporter, Importer};
