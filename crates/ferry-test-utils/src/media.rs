// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory photo library and destination.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use ferry_core::models::{PhotoAlbum, PhotoModel};
use ferry_core::{AuthData, FerryError};
use ferry_transfer::media::{AlbumPage, MediaDestination, MediaLibrary, MediaPage};

fn photo(id: &str) -> PhotoModel {
    PhotoModel {
        data_id: id.to_string(),
        title: format!("{id}.jpg"),
        album_id: None,
        description: None,
        media_type: Some("image/jpeg".into()),
        fetchable_url: Some(format!("memory://{id}")),
        size_bytes: Some(1024),
    }
}

/// A source library of albums and media served in fixed-size pages.
///
/// Listing the root returns every media item, album members included, the
/// way real photo libraries do.
pub struct MemoryMediaLibrary {
    albums: Vec<(PhotoAlbum, Vec<String>)>,
    media: BTreeMap<String, PhotoModel>,
    page_size: usize,
}

impl MemoryMediaLibrary {
    pub fn new(page_size: usize) -> Self {
        Self {
            albums: Vec::new(),
            media: BTreeMap::new(),
            page_size: page_size.max(1),
        }
    }

    pub fn with_album(mut self, id: &str, media: &[&str]) -> Self {
        for m in media {
            self.media.insert(m.to_string(), photo(m));
        }
        let album = PhotoAlbum {
            id: id.to_string(),
            name: format!("Album {id}"),
            description: None,
        };
        self.albums
            .push((album, media.iter().map(|m| m.to_string()).collect()));
        self
    }

    pub fn with_root_media(mut self, media: &[&str]) -> Self {
        for m in media {
            self.media.insert(m.to_string(), photo(m));
        }
        self
    }

    fn page<T: Clone>(&self, all: &[T], token: Option<&str>) -> Result<(Vec<T>, Option<String>), FerryError> {
        let start = match token {
            Some(t) => t
                .parse::<usize>()
                .map_err(|_| FerryError::Internal(format!("bad library page token `{t}`")))?,
            None => 0,
        };
        let end = (start + self.page_size).min(all.len());
        let next = (end < all.len()).then(|| end.to_string());
        Ok((all[start.min(end)..end].to_vec(), next))
    }

    fn not_found(kind: &str, id: &str) -> FerryError {
        FerryError::Item {
            id: id.to_string(),
            message: format!("no such {kind}"),
        }
    }
}

#[async_trait]
impl MediaLibrary for MemoryMediaLibrary {
    async fn list_albums(
        &self,
        _auth: &AuthData,
        page_token: Option<&str>,
    ) -> Result<AlbumPage, FerryError> {
        let all: Vec<_> = self.albums.iter().map(|(a, _)| a.clone()).collect();
        let (albums, next_page_token) = self.page(&all, page_token)?;
        Ok(AlbumPage {
            albums,
            next_page_token,
        })
    }

    async fn list_media(
        &self,
        _auth: &AuthData,
        album_id: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<MediaPage, FerryError> {
        let all: Vec<PhotoModel> = match album_id {
            Some(id) => {
                let (_, members) = self
                    .albums
                    .iter()
                    .find(|(a, _)| a.id == id)
                    .ok_or_else(|| Self::not_found("album", id))?;
                members
                    .iter()
                    .filter_map(|m| self.media.get(m).cloned())
                    .collect()
            }
            None => self.media.values().cloned().collect(),
        };
        let (media, next_page_token) = self.page(&all, page_token)?;
        Ok(MediaPage {
            media,
            next_page_token,
        })
    }

    async fn get_album(&self, _auth: &AuthData, album_id: &str) -> Result<PhotoAlbum, FerryError> {
        self.albums
            .iter()
            .find(|(a, _)| a.id == album_id)
            .map(|(a, _)| a.clone())
            .ok_or_else(|| Self::not_found("album", album_id))
    }

    async fn get_media(&self, _auth: &AuthData, media_id: &str) -> Result<PhotoModel, FerryError> {
        self.media
            .get(media_id)
            .cloned()
            .ok_or_else(|| Self::not_found("media", media_id))
    }
}

/// A destination that records created albums and uploads.
#[derive(Default)]
pub struct MemoryMediaDestination {
    reject: Vec<String>,
    albums: Mutex<Vec<String>>,
    uploads: Mutex<Vec<(Option<String>, String)>>,
}

impl MemoryMediaDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail uploads of these media ids with item errors.
    pub fn rejecting(mut self, media: &[&str]) -> Self {
        self.reject = media.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Source ids of created albums, in creation order.
    pub fn albums(&self) -> Vec<String> {
        self.albums.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// `(destination album, source media id)` per upload, in upload order.
    pub fn uploads(&self) -> Vec<(Option<String>, String)> {
        self.uploads.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl MediaDestination for MemoryMediaDestination {
    async fn create_album(&self, _auth: &AuthData, album: &PhotoAlbum) -> Result<String, FerryError> {
        self.albums
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(album.id.clone());
        Ok(format!("dest-{}", album.id))
    }

    async fn upload_batch(
        &self,
        _auth: &AuthData,
        album_id: Option<&str>,
        media: &[PhotoModel],
    ) -> Result<Vec<Result<String, FerryError>>, FerryError> {
        let mut uploads = self.uploads.lock().unwrap_or_else(|e| e.into_inner());
        Ok(media
            .iter()
            .map(|m| {
                if self.reject.contains(&m.data_id) {
                    return Err(FerryError::Item {
                        id: m.data_id.clone(),
                        message: "rejected by destination".into(),
                    });
                }
                uploads.push((album_id.map(str::to_string), m.data_id.clone()));
                Ok(format!("dest-{}", m.data_id))
            })
            .collect())
    }
}
