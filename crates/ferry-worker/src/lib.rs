// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker tier for Ferry.
//!
//! A worker claims a job whose credentials are available by publishing a
//! freshly generated public key, waits for the front end to seal the final
//! credentials against that key, then opens them and runs the transfer.
//! Every state change goes through a conditional update; a lost race means
//! the job belongs to someone else and is abandoned.

pub mod polling;
pub mod processor;
pub mod shutdown;
pub mod worker;

pub use polling::{ClaimedJob, JobPoller};
pub use processor::JobProcessor;
pub use shutdown::install_signal_handler;
pub use worker::Worker;
