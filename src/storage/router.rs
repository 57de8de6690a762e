//! Storage router
//!
//! Picks the backend once from [`StorageConfig`] and forwards every call to it. Errors
//! pass through untouched so callers can still tell NotFound from a transient failure.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{info, warn};

use super::backend::{Artifact, ArtifactInfo, BackendKind, StorageBackend};
use super::error::StorageResult;
use super::filesystem::FilesystemBackend;
use super::naming::ArtifactId;
use super::s3::S3Backend;
use crate::config::{BackendConfig, StorageConfig};

/// Uniform entry point to the backend selected at startup
#[derive(Clone)]
pub struct StorageRouter {
    backend: Arc<dyn StorageBackend>,
}

impl StorageRouter {
    /// Select and construct the configured backend
    pub async fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        let backend: Arc<dyn StorageBackend> = match &config.backend {
            BackendConfig::Local { root } => {
                warn!(
                    root = %root.display(),
                    "Using local presentation storage; files are lost on restart"
                );
                Arc::new(FilesystemBackend::local(root.clone()))
            }
            BackendConfig::MountedDisk { root } => {
                Arc::new(FilesystemBackend::mounted(root.clone()))
            }
            BackendConfig::ObjectStore(store) => Arc::new(S3Backend::new(store).await?),
        };

        info!(
            backend = %backend.kind(),
            location = %backend.describe(),
            durable = backend.kind().is_durable(),
            "Storage backend selected"
        );

        Ok(Self { backend })
    }

    /// Wrap an already constructed backend
    #[cfg(test)]
    pub fn with_backend(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    pub async fn verify(&self) -> StorageResult<()> {
        self.backend.verify().await
    }

    pub async fn save(&self, id: &ArtifactId, bytes: Bytes) -> StorageResult<ArtifactInfo> {
        self.backend.save(id, bytes).await
    }

    pub async fn load(&self, id: &ArtifactId) -> StorageResult<Artifact> {
        self.backend.load(id).await
    }

    pub async fn exists(&self, id: &ArtifactId) -> StorageResult<bool> {
        self.backend.exists(id).await
    }

    pub async fn delete(&self, id: &ArtifactId) -> StorageResult<()> {
        self.backend.delete(id).await
    }

    pub async fn list(&self) -> StorageResult<Vec<ArtifactInfo>> {
        self.backend.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ObjectStoreConfig, StaticCredentials};
    use crate::storage::StorageError;
    use std::time::Duration;
    use tokio_test::assert_ok;

    fn storage_config(backend: BackendConfig) -> StorageConfig {
        StorageConfig {
            backend,
            base_url: None,
            platform_url: None,
        }
    }

    #[tokio::test]
    async fn test_selects_local() {
        let dir = tempfile::tempdir().unwrap();
        let router = StorageRouter::from_config(&storage_config(BackendConfig::Local {
            root: dir.path().to_path_buf(),
        }))
        .await
        .unwrap();

        assert_eq!(router.kind(), BackendKind::Local);
        assert_eq!(router.describe(), dir.path().display().to_string());
    }

    #[tokio::test]
    async fn test_selects_object_store() {
        let router = StorageRouter::from_config(&storage_config(BackendConfig::ObjectStore(
            ObjectStoreConfig {
                bucket: "decks".to_string(),
                region: "us-east-1".to_string(),
                credentials: Some(StaticCredentials {
                    access_key_id: "AKIDEXAMPLE".to_string(),
                    secret_access_key: "secret".to_string(),
                }),
                endpoint_url: None,
                key_prefix: "presentations/".to_string(),
                timeout: Duration::from_secs(5),
            },
        )))
        .await
        .unwrap();

        assert_eq!(router.kind(), BackendKind::ObjectStore);
        assert_eq!(router.describe(), "s3://decks/presentations/");
    }

    #[tokio::test]
    async fn test_delegates_and_passes_errors_through() {
        let dir = tempfile::tempdir().unwrap();
        let router = StorageRouter::from_config(&storage_config(BackendConfig::MountedDisk {
            root: dir.path().to_path_buf(),
        }))
        .await
        .unwrap();
        let id = ArtifactId::parse("routed").unwrap();

        assert_ok!(router.save(&id, Bytes::from_static(b"deck")).await);
        assert!(assert_ok!(router.exists(&id).await));
        assert_eq!(
            assert_ok!(router.load(&id).await).bytes,
            Bytes::from_static(b"deck")
        );
        assert_eq!(assert_ok!(router.list().await).len(), 1);

        assert_ok!(router.delete(&id).await);
        assert!(matches!(
            router.load(&id).await,
            Err(StorageError::NotFound(_))
        ));
    }
}
