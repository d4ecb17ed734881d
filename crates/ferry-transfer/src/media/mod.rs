// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phased album/media transfer.
//!
//! The exporter walks a source library in two token phases: `album:` pages
//! the album list (each album becomes a child container), then `media:`
//! pages the media inside one album or at the library root. Providers plug in
//! through [`MediaLibrary`] on the source side and [`MediaDestination`] on
//! the destination side.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ferry_core::models::{PhotoAlbum, PhotoModel};
use ferry_core::{AuthData, FerryError};

pub mod exporter;
pub mod importer;

pub use exporter::AlbumMediaExporter;
pub use importer::AlbumMediaImporter;

/// Token prefix of the album listing phase.
pub const ALBUM_PREFIX: &str = "album:";
/// Token prefix of the media listing phase.
pub const MEDIA_PREFIX: &str = "media:";
/// Blob key of the scratch index of media already inside some album.
pub const CONTAINED_INDEX_KEY: &str = "contained-media-index";

/// One page of albums from a source library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumPage {
    pub albums: Vec<PhotoAlbum>,
    pub next_page_token: Option<String>,
}

/// One page of media items from a source library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaPage {
    pub media: Vec<PhotoModel>,
    pub next_page_token: Option<String>,
}

/// Read access to a provider's photo library.
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    async fn list_albums(
        &self,
        auth: &AuthData,
        page_token: Option<&str>,
    ) -> Result<AlbumPage, FerryError>;

    /// Media in `album_id`, or every item in the library when `None`.
    async fn list_media(
        &self,
        auth: &AuthData,
        album_id: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<MediaPage, FerryError>;

    async fn get_album(&self, auth: &AuthData, album_id: &str) -> Result<PhotoAlbum, FerryError>;

    async fn get_media(&self, auth: &AuthData, media_id: &str) -> Result<PhotoModel, FerryError>;
}

/// Write access to a provider's photo library.
#[async_trait]
pub trait MediaDestination: Send + Sync {
    /// Create an album and return its destination-side id.
    async fn create_album(&self, auth: &AuthData, album: &PhotoAlbum) -> Result<String, FerryError>;

    /// Upload a batch into `album_id` (or the root), returning one outcome
    /// per item in input order. Each success carries the destination id.
    async fn upload_batch(
        &self,
        auth: &AuthData,
        album_id: Option<&str>,
        media: &[PhotoModel],
    ) -> Result<Vec<Result<String, FerryError>>, FerryError>;
}

/// Ids of media that appear in at least one album, built once per job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainedMediaIndex {
    pub contained: BTreeSet<String>,
}

impl ContainedMediaIndex {
    pub fn contains(&self, media_id: &str) -> bool {
        self.contained.contains(media_id)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, FerryError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FerryError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Idempotent key of a media item: `{albumId}-{mediaId}` or `root-{mediaId}`.
pub fn media_key(album_id: Option<&str>, media_id: &str) -> String {
    format!("{}-{media_id}", album_id.unwrap_or("root"))
}

/// Idempotent key of an album's creation: `album:{albumId}`.
pub fn album_key(album_id: &str) -> String {
    format!("album:{album_id}")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_key_disambiguates_by_album() {
        assert_eq!(media_key(Some("a1"), "p1"), "a1-p1");
        assert_eq!(media_key(None, "p1"), "root-p1");
        assert_ne!(album_key("a-b"), media_key(Some("a"), "b"));
    }

    #[test]
    fn contained_index_round_trips_as_json() {
        let mut index = ContainedMediaIndex::default();
        index.contained.insert("p2".into());
        let bytes = index.to_bytes().unwrap();
        assert!(String::from_utf8(bytes.clone()).unwrap().contains("\"p2\""));
        assert!(ContainedMediaIndex::from_bytes(&bytes).unwrap().contains("p2"));
    }
}
