// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Album-aware batched media importer.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use ferry_core::models::{ContainerResource, ImportResult, PhotoModel, PhotosContainer};
use ferry_core::{AdapterType, AuthData, FerryError, JobId, PluginAdapter};

use super::{MediaDestination, album_key, media_key};
use crate::executor::IdempotentExecutor;
use crate::traits::Importer;

/// Creates albums, then uploads media in batches into the album each item
/// was exported from.
///
/// Album creation goes through `execute_or_throw` keyed by [`album_key`], so
/// the destination id is cached for the photos that follow. Each media
/// item is keyed by [`media_key`] and only items without a cached result are
/// uploaded.
pub struct AlbumMediaImporter {
    name: String,
    destination: Arc<dyn MediaDestination>,
    batch_size: usize,
}

impl AlbumMediaImporter {
    pub fn new(
        name: impl Into<String>,
        destination: Arc<dyn MediaDestination>,
        batch_size: usize,
    ) -> Self {
        Self {
            name: name.into(),
            destination,
            batch_size: batch_size.max(1),
        }
    }

    async fn import_albums(
        &self,
        executor: &IdempotentExecutor,
        auth: &AuthData,
        container: &PhotosContainer,
    ) -> Result<i64, FerryError> {
        let destination = &self.destination;
        let mut created = 0;
        for album in &container.albums {
            let key = album_key(&album.id);
            if executor.is_key_cached(&key).await {
                continue;
            }
            let dest_id: Option<String> = executor
                .execute_or_throw(&key, &album.name, move || async move {
                    destination.create_album(auth, album).await
                })
                .await?;
            if dest_id.is_some() {
                created += 1;
            }
        }
        Ok(created)
    }

    /// Upload the photos of one source album (or the root).
    async fn import_group(
        &self,
        executor: &IdempotentExecutor,
        auth: &AuthData,
        album_id: Option<&str>,
        photos: &[&PhotoModel],
    ) -> Result<ImportResult, FerryError> {
        let target = match album_id {
            None => None,
            Some(album) => match executor.get_cached_value::<String>(&album_key(album)).await? {
                Some(dest) => Some(dest),
                None => {
                    for photo in photos {
                        let key = media_key(album_id, &photo.data_id);
                        executor
                            .execute_and_swallow::<String, _, _>(&key, &photo.title, move || async move {
                                Err(FerryError::Item {
                                    id: photo.data_id.clone(),
                                    message: format!("destination album for `{album}` was not created"),
                                })
                            })
                            .await?;
                    }
                    return Ok(ImportResult::ok());
                }
            },
        };

        let mut pending = Vec::with_capacity(photos.len());
        for photo in photos {
            if !executor.is_key_cached(&media_key(album_id, &photo.data_id)).await {
                pending.push((*photo).clone());
            }
        }
        if pending.len() < photos.len() {
            debug!(
                job_id = %executor.job_id(),
                album = album_id.unwrap_or("root"),
                cached = photos.len() - pending.len(),
                "skipping media already imported"
            );
        }

        let mut result = ImportResult::ok();
        for batch in pending.chunks(self.batch_size) {
            let outcomes = self
                .destination
                .upload_batch(auth, target.as_deref(), batch)
                .await?;
            if outcomes.len() != batch.len() {
                return Err(FerryError::Internal(format!(
                    "{} returned {} outcomes for a batch of {}",
                    self.name,
                    outcomes.len(),
                    batch.len()
                )));
            }
            for (photo, outcome) in batch.iter().zip(outcomes) {
                let uploaded = self
                    .record_outcome(executor, auth, album_id, target.as_deref(), photo, outcome)
                    .await?;
                if uploaded {
                    result = result
                        .with_count("PHOTOS", 1)
                        .with_bytes(photo.size_bytes.unwrap_or(0));
                }
            }
        }
        Ok(result)
    }

    /// Feed one batch outcome through the executor.
    ///
    /// The first attempt replays the batch outcome; any retry uploads the
    /// single item again.
    async fn record_outcome(
        &self,
        executor: &IdempotentExecutor,
        auth: &AuthData,
        album_id: Option<&str>,
        target: Option<&str>,
        photo: &PhotoModel,
        outcome: Result<String, FerryError>,
    ) -> Result<bool, FerryError> {
        let destination = &self.destination;
        let mut first = Some(outcome);
        let key = media_key(album_id, &photo.data_id);
        let dest_id: Option<String> = executor
            .execute_and_swallow(&key, &photo.title, move || {
                let replay = first.take();
                async move {
                    match replay {
                        Some(outcome) => outcome,
                        None => destination
                            .upload_batch(auth, target, std::slice::from_ref(photo))
                            .await?
                            .into_iter()
                            .next()
                            .unwrap_or_else(|| {
                                Err(FerryError::Internal("empty upload response".into()))
                            }),
                    }
                }
            })
            .await?;
        Ok(dest_id.is_some())
    }
}

/// Photos grouped by source album, in first-seen order.
fn group_by_album(photos: &[PhotoModel]) -> Vec<(Option<&str>, Vec<&PhotoModel>)> {
    let mut groups: Vec<(Option<&str>, Vec<&PhotoModel>)> = Vec::new();
    for photo in photos {
        let album = photo.album_id.as_deref();
        match groups.iter_mut().find(|(a, _)| *a == album) {
            Some((_, members)) => members.push(photo),
            None => groups.push((album, vec![photo])),
        }
    }
    groups
}

#[async_trait]
impl PluginAdapter for AlbumMediaImporter {
    fn name(&self) -> &str {
        &self.name
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Importer
    }
}

#[async_trait]
impl Importer for AlbumMediaImporter {
    async fn import(
        &self,
        _job_id: JobId,
        executor: &IdempotentExecutor,
        auth: &AuthData,
        data: &ContainerResource,
    ) -> Result<ImportResult, FerryError> {
        let ContainerResource::Photos(container) = data else {
            return Err(FerryError::Internal(format!(
                "{} only imports photo containers",
                self.name
            )));
        };

        let albums = self.import_albums(executor, auth, container).await?;
        let mut result = ImportResult::ok();
        if albums > 0 {
            result = result.with_count("ALBUMS", albums);
        }
        for (album_id, photos) in group_by_album(&container.photos) {
            let group = self.import_group(executor, auth, album_id, &photos).await?;
            result = result.merge(group);
        }
        Ok(result)
    }
}
