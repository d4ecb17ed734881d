// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authorization flow contract for one provider and mode.

use async_trait::async_trait;

use crate::error::FerryError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{AuthData, JobId};

/// The first leg of an authorization flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFlowConfiguration {
    /// Where to redirect the user.
    pub auth_url: String,
    /// Mid-flow state (e.g. an OAuth1 request token secret) that must be kept
    /// until the callback arrives.
    pub initial_auth_data: Option<AuthData>,
}

/// Produces redirect URLs and exchanges callback codes for credentials.
#[async_trait]
pub trait AuthDataGenerator: PluginAdapter {
    /// Start a flow, returning the redirect URL and optional initial auth data.
    async fn generate_configuration(
        &self,
        callback_base_url: &str,
        job_id: JobId,
    ) -> Result<AuthFlowConfiguration, FerryError>;

    /// Exchange the callback code for final auth data.
    async fn generate_auth_data(
        &self,
        callback_base_url: &str,
        auth_code: &str,
        job_id: JobId,
        initial_auth_data: Option<&AuthData>,
        extra: Option<&str>,
    ) -> Result<AuthData, FerryError>;
}
