// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job store backends for the Ferry transfer system.
//!
//! [`SqliteJobStore`] keeps job records in a WAL-mode SQLite file with
//! embedded migrations and a single-writer connection via `tokio-rusqlite`.
//! [`MemoryJobStore`] keeps everything in process memory for tests and
//! single-process runs.

pub mod adapter;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteJobStore;
pub use database::Database;
pub use memory::MemoryJobStore;
