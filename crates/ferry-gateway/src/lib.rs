// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Front-end tier for Ferry.
//!
//! The [`JobManager`] creates jobs, drives each side's authorization flow
//! through an [`AuthServiceRegistry`], keeps mid-flow auth data encrypted
//! under the job's session key, and seals the final credentials against the
//! public key of whichever worker claimed the job.

pub mod auth;
pub mod manager;

pub use auth::AuthServiceRegistry;
pub use manager::{JobManager, JobStatus};
