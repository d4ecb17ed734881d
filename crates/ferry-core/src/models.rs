// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data exchanged between exporters, importers, and the driver loop.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, FerryError};
pub use crate::pagination::PaginationToken;

/// One page's worth of items plus structural metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContainerResource {
    /// A reference to a container whose contents still need exporting.
    IdOnly(IdOnlyContainer),
    Photos(PhotosContainer),
    /// Flat items for verticals without a container hierarchy.
    Items(ItemsContainer),
}

impl ContainerResource {
    pub fn id_only(id: impl Into<String>) -> Self {
        ContainerResource::IdOnly(IdOnlyContainer { id: id.into() })
    }

    /// Whether the container carries nothing to import.
    pub fn is_empty(&self) -> bool {
        match self {
            ContainerResource::IdOnly(_) => true,
            ContainerResource::Photos(c) => c.albums.is_empty() && c.photos.is_empty(),
            ContainerResource::Items(c) => c.items.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdOnlyContainer {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoModel {
    /// Source-side identifier, stable across retries.
    pub data_id: String,
    pub title: String,
    /// Source album this photo was exported from, if any.
    #[serde(default)]
    pub album_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub fetchable_url: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotosContainer {
    #[serde(default)]
    pub albums: Vec<PhotoAlbum>,
    #[serde(default)]
    pub photos: Vec<PhotoModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemsContainer {
    pub items: Vec<GenericItem>,
}

/// Where an export call should start: a page token, a container, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportInformation {
    #[serde(default)]
    pub pagination: Option<PaginationToken>,
    #[serde(default)]
    pub container: Option<ContainerResource>,
}

impl ExportInformation {
    pub fn page(token: PaginationToken, container: Option<ContainerResource>) -> Self {
        Self {
            pagination: Some(token),
            container,
        }
    }

    pub fn container(container: ContainerResource) -> Self {
        Self {
            pagination: None,
            container: Some(container),
        }
    }
}

/// Next pagination token plus child containers still to be exported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinuationData {
    #[serde(default)]
    pub pagination: Option<PaginationToken>,
    #[serde(default)]
    pub containers: Vec<ContainerResource>,
}

impl ContinuationData {
    pub fn new(pagination: Option<PaginationToken>) -> Self {
        Self {
            pagination,
            containers: Vec::new(),
        }
    }

    pub fn add_container(&mut self, container: ContainerResource) {
        self.containers.push(container);
    }

    pub fn is_empty(&self) -> bool {
        self.pagination.is_none() && self.containers.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultType {
    Continue,
    End,
}

/// Output of one export call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportResult {
    pub result_type: ResultType,
    pub exported: Option<ContainerResource>,
    pub continuation: Option<ContinuationData>,
}

impl ExportResult {
    pub fn end(exported: Option<ContainerResource>) -> Self {
        Self {
            result_type: ResultType::End,
            exported,
            continuation: None,
        }
    }

    /// A result with more work to follow, or `End` when `continuation` is empty.
    pub fn with_continuation(
        exported: Option<ContainerResource>,
        continuation: ContinuationData,
    ) -> Self {
        if continuation.is_empty() {
            return Self::end(exported);
        }
        Self {
            result_type: ResultType::Continue,
            exported,
            continuation: Some(continuation),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStatus {
    Ok,
    Error,
}

/// Outcome of importing one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResult {
    pub status: ImportStatus,
    /// Items written per item type, e.g. `ALBUMS` or `PHOTOS`.
    pub counts: BTreeMap<String, i64>,
    pub bytes: Option<u64>,
    pub message: Option<String>,
}

impl ImportResult {
    pub fn ok() -> Self {
        Self {
            status: ImportStatus::Ok,
            counts: BTreeMap::new(),
            bytes: None,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ImportStatus::Error,
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    pub fn with_count(mut self, item_type: impl Into<String>, count: i64) -> Self {
        *self.counts.entry(item_type.into()).or_insert(0) += count;
        self
    }

    pub fn with_bytes(mut self, bytes: u64) -> Self {
        self.bytes = Some(self.bytes.unwrap_or(0) + bytes);
        self
    }

    /// Combine two results: any error wins, counts and bytes are summed.
    pub fn merge(mut self, other: ImportResult) -> Self {
        if other.status == ImportStatus::Error {
            self.status = ImportStatus::Error;
            self.message = other.message.or(self.message);
        }
        for (k, v) in other.counts {
            *self.counts.entry(k).or_insert(0) += v;
        }
        self.bytes = match (self.bytes, other.bytes) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
        };
        self
    }
}

/// A recorded failure for one idempotent key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// The idempotent key of the failed unit of work.
    pub id: String,
    /// Human-readable name of the item, e.g. a photo title.
    pub title: String,
    /// Summary of the error that caused the failure.
    pub exception: String,
    pub kind: ErrorKind,
    pub can_skip: bool,
    pub recorded_at: DateTime<Utc>,
}

impl ErrorDetail {
    pub fn from_error(
        id: impl Into<String>,
        title: impl Into<String>,
        error: &FerryError,
        can_skip: bool,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            exception: error.to_string(),
            kind: error.root().kind(),
            can_skip,
            recorded_at: Utc::now(),
        }
    }
}
