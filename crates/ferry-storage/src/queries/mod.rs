// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Every function takes `&Database` and runs one
//! closure on the connection thread.

pub mod blobs;
pub mod counts;
pub mod errors;
pub mod idempotent;
pub mod jobs;
pub mod stacks;
