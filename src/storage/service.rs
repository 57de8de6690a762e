//! Presentation store: the interface presentation generators call
//!
//! Ties naming, the storage router and URL resolution together so a caller holding
//! freshly generated bytes gets back an id and a download link in one call.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::info;

use super::backend::{Artifact, ArtifactInfo};
use super::error::{StorageError, StorageResult};
use super::naming::{ArtifactId, ArtifactNamer};
use super::router::StorageRouter;
use super::url_resolver::{DownloadUrl, UrlResolver};

/// Result of publishing a generated presentation
#[derive(Debug, Clone)]
pub struct PublishedPresentation {
    pub id: ArtifactId,
    pub download_url: DownloadUrl,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// A stored presentation together with its current download link
#[derive(Debug, Clone)]
pub struct ListedPresentation {
    pub info: ArtifactInfo,
    pub download_url: DownloadUrl,
}

pub struct PresentationStore {
    router: StorageRouter,
    urls: UrlResolver,
    namer: ArtifactNamer,
}

impl PresentationStore {
    pub fn new(router: StorageRouter, urls: UrlResolver) -> Self {
        Self {
            router,
            urls,
            namer: ArtifactNamer::new(),
        }
    }

    pub fn router(&self) -> &StorageRouter {
        &self.router
    }

    pub fn urls(&self) -> &UrlResolver {
        &self.urls
    }

    /// Name, persist and link a generated presentation
    pub async fn publish(
        &self,
        suggested_name: Option<&str>,
        bytes: Bytes,
    ) -> StorageResult<PublishedPresentation> {
        if bytes.is_empty() {
            return Err(StorageError::EmptyPayload);
        }

        let id = self.namer.next_id(suggested_name);
        let info = self.router.save(&id, bytes).await?;
        let download_url = self.urls.resolve(&id);

        info!(
            id = %id,
            size = info.size,
            url = %download_url,
            "Presentation published"
        );

        Ok(PublishedPresentation {
            id,
            download_url,
            size: info.size,
            created_at: info.created_at,
        })
    }

    pub async fn fetch(&self, id: &ArtifactId) -> StorageResult<Artifact> {
        self.router.load(id).await
    }

    pub fn url_for(&self, id: &ArtifactId) -> DownloadUrl {
        self.urls.resolve(id)
    }

    pub async fn exists(&self, id: &ArtifactId) -> StorageResult<bool> {
        self.router.exists(id).await
    }

    /// Delete a stored presentation; removing one that is already gone succeeds
    pub async fn remove(&self, id: &ArtifactId) -> StorageResult<()> {
        self.router.delete(id).await
    }

    /// Stored presentations, newest first
    pub async fn list(&self) -> StorageResult<Vec<ListedPresentation>> {
        let mut infos = self.router.list().await?;
        infos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(infos
            .into_iter()
            .map(|info| ListedPresentation {
                download_url: self.urls.resolve(&info.id),
                info,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FilesystemBackend;
    use std::sync::Arc;
    use tokio_test::assert_ok;

    fn store(root: &std::path::Path) -> PresentationStore {
        PresentationStore::new(
            StorageRouter::with_backend(Arc::new(FilesystemBackend::local(root))),
            UrlResolver::with_base("https://svc.example.com").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_publish_then_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let payload = Bytes::from_static(b"PK\x03\x04deck");
        let published = assert_ok!(store.publish(Some("Board Update.pptx"), payload.clone()).await);

        assert!(published.id.as_str().starts_with("board-update-"));
        assert_eq!(
            published.download_url.as_str(),
            format!("https://svc.example.com/presentations/{}", published.id)
        );
        assert_eq!(published.size, payload.len() as u64);
        assert_eq!(assert_ok!(store.fetch(&published.id).await).bytes, payload);
        assert_eq!(store.url_for(&published.id), published.download_url);
    }

    #[tokio::test]
    async fn test_publish_rejects_empty_payload() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(dir.path())
            .publish(Some("empty"), Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::EmptyPayload));
    }

    #[tokio::test]
    async fn test_same_name_publishes_distinct_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let first = assert_ok!(store.publish(Some("deck"), Bytes::from_static(b"one")).await);
        let second = assert_ok!(store.publish(Some("deck"), Bytes::from_static(b"two")).await);
        assert_ne!(first.id, second.id);

        let listed = assert_ok!(store.list().await);
        assert_eq!(listed.len(), 2);
        assert!(listed
            .iter()
            .all(|p| p.download_url == store.url_for(&p.info.id)));
    }

    #[tokio::test]
    async fn test_exists_tracks_removal() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let published = assert_ok!(store.publish(None, Bytes::from_static(b"x")).await);
        assert!(assert_ok!(store.exists(&published.id).await));

        assert_ok!(store.remove(&published.id).await);
        assert!(!assert_ok!(store.exists(&published.id).await));
        assert_ok!(store.remove(&published.id).await);
        assert!(matches!(
            store.fetch(&published.id).await,
            Err(StorageError::NotFound(_))
        ));
    }
}
