// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-phase album/media exporter.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use ferry_core::models::{
    ContainerResource, ContinuationData, ExportInformation, ExportResult, PaginationToken,
    PhotosContainer,
};
use ferry_core::pagination::{TokenPhases, expect_prefix};
use ferry_core::{AdapterType, AuthData, FerryError, JobId, JobStore, PluginAdapter};

use super::{ALBUM_PREFIX, CONTAINED_INDEX_KEY, ContainedMediaIndex, MEDIA_PREFIX, MediaLibrary};
use crate::traits::Exporter;

const PHASES: &[&str] = &[ALBUM_PREFIX, MEDIA_PREFIX];

/// Exports albums first, then the media of each album, then root media.
///
/// The root call runs a pre-pass over every album and stores the ids of all
/// album members as a job blob. Root media pages skip those ids so a photo
/// that lives in an album is exported once, inside its album.
pub struct AlbumMediaExporter {
    name: String,
    library: Arc<dyn MediaLibrary>,
    store: Arc<dyn JobStore>,
}

impl AlbumMediaExporter {
    pub fn new(
        name: impl Into<String>,
        library: Arc<dyn MediaLibrary>,
        store: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            name: name.into(),
            library,
            store,
        }
    }

    async fn build_contained_index(&self, job_id: JobId, auth: &AuthData) -> Result<(), FerryError> {
        let mut index = ContainedMediaIndex::default();
        let mut album_token: Option<String> = None;
        loop {
            let albums = self
                .library
                .list_albums(auth, album_token.as_deref())
                .await?;
            for album in &albums.albums {
                let mut media_token: Option<String> = None;
                loop {
                    let page = self
                        .library
                        .list_media(auth, Some(&album.id), media_token.as_deref())
                        .await?;
                    index
                        .contained
                        .extend(page.media.into_iter().map(|m| m.data_id));
                    media_token = non_empty(page.next_page_token);
                    if media_token.is_none() {
                        break;
                    }
                }
            }
            album_token = non_empty(albums.next_page_token);
            if album_token.is_none() {
                break;
            }
        }
        info!(job_id = %job_id, contained = index.contained.len(), "built contained media index");
        self.store
            .create_blob(job_id, CONTAINED_INDEX_KEY, index.to_bytes()?)
            .await
    }

    async fn load_contained_index(&self, job_id: JobId) -> Result<Option<ContainedMediaIndex>, FerryError> {
        self.store
            .get_blob(job_id, CONTAINED_INDEX_KEY)
            .await?
            .map(|bytes| ContainedMediaIndex::from_bytes(&bytes))
            .transpose()
    }

    /// One page of the album list. The last page hands over to the root media phase.
    async fn export_albums(
        &self,
        auth: &AuthData,
        provider_token: Option<&str>,
    ) -> Result<ExportResult, FerryError> {
        let page = self.library.list_albums(auth, provider_token).await?;
        let next = match non_empty(page.next_page_token) {
            Some(token) => PaginationToken::with_prefix(ALBUM_PREFIX, Some(&token)),
            None => PaginationToken::with_prefix(MEDIA_PREFIX, None),
        };
        let mut continuation = ContinuationData::new(Some(next));
        for album in &page.albums {
            continuation.add_container(ContainerResource::id_only(&album.id));
        }
        let exported = ContainerResource::Photos(PhotosContainer {
            albums: page.albums,
            photos: Vec::new(),
        });
        Ok(ExportResult::with_continuation(Some(exported), continuation))
    }

    /// One page of media inside `album_id`, or at the root when `None`.
    async fn export_media(
        &self,
        job_id: JobId,
        auth: &AuthData,
        album_id: Option<&str>,
        token: Option<&PaginationToken>,
    ) -> Result<ExportResult, FerryError> {
        let provider_token = match token {
            Some(token) => expect_prefix(token, MEDIA_PREFIX)?,
            None => None,
        };
        let page = self
            .library
            .list_media(auth, album_id, provider_token)
            .await?;
        let index = match album_id {
            Some(_) => None,
            None => self.load_contained_index(job_id).await?,
        };

        let listed = page.media.len();
        let photos: Vec<_> = page
            .media
            .into_iter()
            .filter(|m| !index.as_ref().is_some_and(|i| i.contains(&m.data_id)))
            .map(|mut m| {
                m.album_id = album_id.map(str::to_string);
                m
            })
            .collect();
        if photos.len() < listed {
            debug!(
                job_id = %job_id,
                skipped = listed - photos.len(),
                "skipped root media already inside an album"
            );
        }

        let next = non_empty(page.next_page_token)
            .map(|t| PaginationToken::with_prefix(MEDIA_PREFIX, Some(&t)));
        let exported = (!photos.is_empty()).then(|| {
            ContainerResource::Photos(PhotosContainer {
                albums: Vec::new(),
                photos,
            })
        });
        Ok(ExportResult::with_continuation(
            exported,
            ContinuationData::new(next),
        ))
    }

    /// Re-fetch an explicit subset of albums and photos.
    async fn export_subset(
        &self,
        auth: &AuthData,
        subset: &PhotosContainer,
    ) -> Result<ExportResult, FerryError> {
        let mut continuation = ContinuationData::new(None);
        let mut albums = Vec::with_capacity(subset.albums.len());
        for album in &subset.albums {
            let fetched = self.library.get_album(auth, &album.id).await?;
            continuation.add_container(ContainerResource::id_only(&fetched.id));
            albums.push(fetched);
        }
        let mut photos = Vec::with_capacity(subset.photos.len());
        for photo in &subset.photos {
            photos.push(self.library.get_media(auth, &photo.data_id).await?);
        }
        let exported = ContainerResource::Photos(PhotosContainer { albums, photos });
        Ok(ExportResult::with_continuation(Some(exported), continuation))
    }
}

fn non_empty(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.is_empty())
}

#[async_trait]
impl PluginAdapter for AlbumMediaExporter {
    fn name(&self) -> &str {
        &self.name
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Exporter
    }
}

#[async_trait]
impl Exporter for AlbumMediaExporter {
    async fn export(
        &self,
        job_id: JobId,
        auth: &AuthData,
        info: Option<&ExportInformation>,
    ) -> Result<ExportResult, FerryError> {
        let Some(info) = info else {
            self.build_contained_index(job_id, auth).await?;
            return self.export_albums(auth, None).await;
        };
        match (&info.container, &info.pagination) {
            (Some(ContainerResource::Photos(subset)), _) => self.export_subset(auth, subset).await,
            (Some(ContainerResource::IdOnly(album)), token) => {
                self.export_media(job_id, auth, Some(&album.id), token.as_ref())
                    .await
            }
            (Some(ContainerResource::Items(_)), _) => Err(FerryError::Internal(format!(
                "{} cannot export generic items",
                self.name
            ))),
            (None, Some(token)) => {
                let phases = TokenPhases::new(PHASES)?;
                let (phase, rest) = phases.route(token)?;
                if phase == ALBUM_PREFIX {
                    self.export_albums(auth, Some(rest).filter(|r| !r.is_empty()))
                        .await
                } else {
                    self.export_media(job_id, auth, None, Some(token)).await
                }
            }
            (None, None) => {
                self.build_contained_index(job_id, auth).await?;
                self.export_albums(auth, None).await
            }
        }
    }

    fn pagination_phases(&self) -> Option<TokenPhases> {
        TokenPhases::new(PHASES).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::models::{PhotoAlbum, PhotoModel, ResultType};
    use ferry_storage::MemoryJobStore;

    use crate::media::fakes::{FakeLibrary, photo};

    fn auth() -> AuthData {
        AuthData::TokensAndUrl {
            access_token: "t".into(),
            refresh_token: None,
            token_server_url: None,
        }
    }

    fn exporter(library: FakeLibrary) -> (AlbumMediaExporter, Arc<MemoryJobStore>) {
        let store = Arc::new(MemoryJobStore::new());
        (
            AlbumMediaExporter::new("source", Arc::new(library), store.clone()),
            store,
        )
    }

    fn photos(result: &ExportResult) -> (Vec<String>, Vec<String>) {
        match &result.exported {
            Some(ContainerResource::Photos(c)) => (
                c.albums.iter().map(|a| a.id.clone()).collect(),
                c.photos.iter().map(|p| p.data_id.clone()).collect(),
            ),
            None => (vec![], vec![]),
            other => panic!("unexpected container {other:?}"),
        }
    }

    #[tokio::test]
    async fn root_call_indexes_and_lists_first_album_page() {
        let library = FakeLibrary::new(&[("a1", &["p1"]), ("a2", &["p2", "p3"])], &["p4"], 1);
        let (exporter, store) = exporter(library);
        let job_id = JobId::new();

        let result = exporter.export(job_id, &auth(), None).await.unwrap();
        assert_eq!(result.result_type, ResultType::Continue);
        assert_eq!(photos(&result).0, ["a1"]);
        let continuation = result.continuation.unwrap();
        assert_eq!(continuation.pagination.unwrap().as_str(), "album:1");
        assert_eq!(continuation.containers, [ContainerResource::id_only("a1")]);

        let blob = store.get_blob(job_id, CONTAINED_INDEX_KEY).await.unwrap().unwrap();
        let index = ContainedMediaIndex::from_bytes(&blob).unwrap();
        assert_eq!(index.contained.len(), 3);
        assert!(!index.contains("p4"));
    }

    #[tokio::test]
    async fn last_album_page_hands_over_to_media_phase() {
        let library = FakeLibrary::new(&[("a1", &["p1"]), ("a2", &["p2"])], &[], 1);
        let (exporter, _store) = exporter(library);
        let info = ExportInformation::page(PaginationToken::new("album:1"), None);
        let result = exporter.export(JobId::new(), &auth(), Some(&info)).await.unwrap();
        assert_eq!(photos(&result).0, ["a2"]);
        assert_eq!(
            result.continuation.unwrap().pagination.unwrap().as_str(),
            MEDIA_PREFIX
        );
    }

    #[tokio::test]
    async fn root_media_skips_album_members() {
        let library = FakeLibrary::new(&[("a1", &["p1"]), ("a2", &["p2"])], &["p3"], 10);
        let (exporter, _store) = exporter(library);
        let job_id = JobId::new();
        exporter.export(job_id, &auth(), None).await.unwrap();

        let info = ExportInformation::page(PaginationToken::with_prefix(MEDIA_PREFIX, None), None);
        let result = exporter.export(job_id, &auth(), Some(&info)).await.unwrap();
        assert_eq!(photos(&result).1, ["p3"]);
        assert_eq!(result.result_type, ResultType::End);
    }

    #[tokio::test]
    async fn album_media_carry_their_album_id() {
        let library = FakeLibrary::new(&[("a1", &["p1", "p2", "p3"])], &[], 2);
        let (exporter, _store) = exporter(library);
        let info = ExportInformation::container(ContainerResource::id_only("a1"));
        let first = exporter.export(JobId::new(), &auth(), Some(&info)).await.unwrap();
        let ContainerResource::Photos(container) = first.exported.clone().unwrap() else {
            panic!("expected photos");
        };
        assert!(container.photos.iter().all(|p| p.album_id.as_deref() == Some("a1")));
        let next = first.continuation.unwrap().pagination.unwrap();
        assert_eq!(next.as_str(), "media:2");

        let info = ExportInformation::page(next, Some(ContainerResource::id_only("a1")));
        let second = exporter.export(JobId::new(), &auth(), Some(&info)).await.unwrap();
        assert_eq!(photos(&second).1, ["p3"]);
        assert_eq!(second.result_type, ResultType::End);
    }

    #[tokio::test]
    async fn album_token_in_media_phase_is_rejected() {
        let library = FakeLibrary::new(&[("a1", &["p1"])], &[], 10);
        let (exporter, _store) = exporter(library);
        let info = ExportInformation::page(
            PaginationToken::new("album:3"),
            Some(ContainerResource::id_only("a1")),
        );
        let err = exporter
            .export(JobId::new(), &auth(), Some(&info))
            .await
            .unwrap_err();
        assert!(matches!(err, FerryError::InvalidPaginationToken { .. }));
    }

    #[tokio::test]
    async fn subset_export_refetches_items_and_descends_into_albums() {
        let library = FakeLibrary::new(&[("a1", &["p1"])], &["p2"], 10);
        let (exporter, _store) = exporter(library);
        let subset = PhotosContainer {
            albums: vec![PhotoAlbum {
                id: "a1".into(),
                name: String::new(),
                description: None,
            }],
            photos: vec![PhotoModel {
                title: String::new(),
                ..photo("p2")
            }],
        };
        let info = ExportInformation::container(ContainerResource::Photos(subset));
        let result = exporter.export(JobId::new(), &auth(), Some(&info)).await.unwrap();
        let (albums, items) = photos(&result);
        assert_eq!(albums, ["a1"]);
        assert_eq!(items, ["p2"]);
        assert_eq!(
            result.continuation.unwrap().containers,
            [ContainerResource::id_only("a1")]
        );
    }
}
