// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common identifier and credential types shared across Ferry crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Globally unique identifier for one transfer job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        JobId(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(JobId)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role of a pluggable component.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    JobStore,
    Exporter,
    Importer,
    AuthGenerator,
}

/// The kind of data a job moves between services.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataVertical {
    Photos,
    Videos,
    Media,
    Calendar,
    Contacts,
    Mail,
    Tasks,
    Music,
    Playlists,
    SocialPosts,
    Blobs,
}

/// Which side of a transfer a credential or plugin belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    Export,
    Import,
}

/// Credentials for one provider account, as produced by an auth flow.
///
/// Always JSON-encoded and encrypted before it reaches the job store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthData {
    /// OAuth2-style access token with optional refresh material.
    TokensAndUrl {
        access_token: String,
        refresh_token: Option<String>,
        token_server_url: Option<String>,
    },
    /// OAuth1-style token and secret pair.
    TokenSecret { token: String, secret: String },
    /// Session cookies for providers without a token API.
    Cookies { cookies: Vec<String> },
}

impl AuthData {
    /// A short description safe for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthData::TokensAndUrl { .. } => "tokens_and_url",
            AuthData::TokenSecret { .. } => "token_secret",
            AuthData::Cookies { .. } => "cookies",
        }
    }
}

impl fmt::Debug for AuthData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthData")
            .field("kind", &self.kind())
            .field("secrets", &"[REDACTED]")
            .finish()
    }
}
