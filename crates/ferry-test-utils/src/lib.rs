// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Ferry integration tests.
//!
//! Provides fixture providers and a harness that wires a temp SQLite job
//! store, the front end, and a worker together, so a whole transfer can run
//! in-process without any external service.
//!
//! # Components
//!
//! - [`FixtureExporter`] / [`FixtureImporter`] - paged generic items
//! - [`MemoryMediaLibrary`] / [`MemoryMediaDestination`] - album/media providers
//! - [`StaticAuthGenerator`] - auth flow that echoes the callback code
//! - [`TestHarness`] - the assembled stack

pub mod fixtures;
pub mod harness;
pub mod media;

pub use fixtures::{FixtureExporter, FixtureImporter, StaticAuthGenerator, fixture_auth};
pub use harness::{DEST, SOURCE, TestHarness};
pub use media::{MemoryMediaDestination, MemoryMediaLibrary};
