// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phase-prefixed pagination tokens.
//!
//! A multi-phase export namespaces every token it hands out with a literal
//! prefix naming the phase (`album:`, `media:`). Prefixes within one export
//! must not overlap so a saved token routes back to exactly one phase.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FerryError;

/// An opaque continuation token, persisted as a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaginationToken(String);

impl PaginationToken {
    pub fn new(token: impl Into<String>) -> Self {
        PaginationToken(token.into())
    }

    /// A token for `phase` carrying the provider's own page token, if any.
    pub fn with_prefix(prefix: &str, provider_token: Option<&str>) -> Self {
        PaginationToken(format!("{prefix}{}", provider_token.unwrap_or_default()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaginationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The ordered set of phase prefixes one exporter uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPhases {
    prefixes: &'static [&'static str],
}

impl TokenPhases {
    /// Build a phase set, rejecting empty or overlapping prefixes.
    pub fn new(prefixes: &'static [&'static str]) -> Result<Self, FerryError> {
        for (i, a) in prefixes.iter().enumerate() {
            if a.is_empty() {
                return Err(FerryError::Internal("empty pagination prefix".into()));
            }
            for b in &prefixes[i + 1..] {
                if a.starts_with(b) || b.starts_with(a) {
                    return Err(FerryError::Internal(format!(
                        "pagination prefixes `{a}` and `{b}` overlap"
                    )));
                }
            }
        }
        Ok(Self { prefixes })
    }

    pub fn prefixes(&self) -> &'static [&'static str] {
        self.prefixes
    }

    /// Find the phase a token belongs to and the provider token after the prefix.
    pub fn route<'a>(
        &self,
        token: &'a PaginationToken,
    ) -> Result<(&'static str, &'a str), FerryError> {
        self.prefixes
            .iter()
            .find_map(|p| token.as_str().strip_prefix(p).map(|rest| (*p, rest)))
            .ok_or_else(|| FerryError::InvalidPaginationToken {
                token: token.to_string(),
                expected: self.prefixes.join(" | "),
            })
    }
}

/// Strip `prefix` from `token`, failing if the token belongs to another phase.
///
/// Returns `None` when the token is the bare prefix, meaning "first page".
pub fn expect_prefix<'a>(
    token: &'a PaginationToken,
    prefix: &str,
) -> Result<Option<&'a str>, FerryError> {
    match token.as_str().strip_prefix(prefix) {
        Some("") => Ok(None),
        Some(rest) => Ok(Some(rest)),
        None => Err(FerryError::InvalidPaginationToken {
            token: token.to_string(),
            expected: prefix.to_string(),
        }),
    }
}
