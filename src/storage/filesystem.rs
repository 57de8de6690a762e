//! Filesystem backends: local directory and mounted persistent disk
//!
//! Both variants store each presentation as `<root>/<id>.pptx`. They differ only in how
//! the root is treated: the local backend creates it on demand, while the mounted-disk
//! backend refuses to, so a missing volume surfaces in health checks instead of quietly
//! turning into ephemeral container storage.
//!
//! Writes go to a hidden temp file in the same directory, are fsynced and then renamed
//! over the target, so readers see either the old bytes or the new ones.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, instrument, warn};

use super::backend::{Artifact, ArtifactInfo, BackendKind, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::naming::ArtifactId;

const TEMP_PREFIX: &str = ".";
const TEMP_SUFFIX: &str = ".partial";

/// Directory-backed presentation storage
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    root: PathBuf,
    kind: BackendKind,
}

impl FilesystemBackend {
    /// Development fallback rooted at a (possibly relative) directory
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            kind: BackendKind::Local,
        }
    }

    /// Persistent volume mounted at an absolute path
    pub fn mounted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            kind: BackendKind::MountedDisk,
        }
    }

    fn path_for(&self, id: &ArtifactId) -> PathBuf {
        self.root.join(id.file_name())
    }

    fn root_unusable(&self, problem: &str) -> StorageError {
        let label = match self.kind {
            BackendKind::MountedDisk => "mount path",
            _ => "presentations directory",
        };
        StorageError::Write {
            target: self.root.display().to_string(),
            message: format!("{} {} {}", label, self.root.display(), problem),
        }
    }

    /// A missing file on a detached volume is an unusable mount, not a missing artifact
    async fn read_failure(&self, id: &ArtifactId, path: &Path, err: io::Error) -> StorageError {
        if err.kind() == io::ErrorKind::NotFound && self.kind == BackendKind::MountedDisk {
            if let Err(unusable) = self.ensure_root().await {
                return unusable;
            }
        }
        StorageError::from_read_io(id.as_str(), path, err)
    }

    async fn ensure_root(&self) -> StorageResult<()> {
        match self.kind {
            BackendKind::Local => fs::create_dir_all(&self.root)
                .await
                .map_err(|e| StorageError::from_write_io(&self.root, e)),
            _ => match fs::metadata(&self.root).await {
                Ok(meta) if meta.is_dir() => Ok(()),
                Ok(_) => Err(self.root_unusable("is not a directory")),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    Err(self.root_unusable("does not exist"))
                }
                Err(e) => Err(self.root_unusable(&format!("cannot be inspected: {}", e))),
            },
        }
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    #[instrument(skip(self), fields(root = %self.root.display(), kind = %self.kind))]
    async fn verify(&self) -> StorageResult<()> {
        self.ensure_root().await?;

        // Creating and dropping a temp file is the only reliable writability test;
        // permission bits lie on read-only mounts.
        let root = self.root.clone();
        let probe = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix(TEMP_PREFIX)
                .suffix(TEMP_SUFFIX)
                .tempfile_in(&root)
                .map(drop)
        })
        .await
        .map_err(|e| self.root_unusable(&format!("could not be probed: {}", e)))?;

        probe.map_err(|e| self.root_unusable(&format!("is not writable: {}", e)))?;
        debug!("Filesystem backend verified");
        Ok(())
    }

    #[instrument(skip(self, bytes), fields(id = %id, size = bytes.len()))]
    async fn save(&self, id: &ArtifactId, bytes: Bytes) -> StorageResult<ArtifactInfo> {
        if self.kind == BackendKind::Local {
            self.ensure_root().await?;
        }

        let target = self.path_for(id);
        let size = bytes.len() as u64;
        let root = self.root.clone();
        let dest = target.clone();

        // Runs to completion even if the request that started it is dropped, so an
        // abandoned upload never leaves a truncated `.pptx` behind.
        tokio::task::spawn_blocking(move || write_atomically(&root, &dest, &bytes))
            .await
            .map_err(|e| StorageError::Write {
                target: target.display().to_string(),
                message: format!("write task failed: {}", e),
            })?
            .map_err(|e| StorageError::from_write_io(&target, e))?;

        info!(path = %target.display(), size, "Saved presentation");

        Ok(ArtifactInfo {
            id: id.clone(),
            size,
            created_at: Utc::now(),
        })
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn load(&self, id: &ArtifactId) -> StorageResult<Artifact> {
        let path = self.path_for(id);
        let read_err = |e| StorageError::from_read_io(id.as_str(), &path, e);

        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) => return Err(self.read_failure(id, &path, e).await),
        };
        let meta = file.metadata().await.map_err(read_err)?;
        // Directories named like an artifact are never listed, so they are not artifacts
        if !meta.is_file() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        let mut buf = Vec::with_capacity(meta.len() as usize);
        file.read_to_end(&mut buf).await.map_err(read_err)?;

        debug!(size = buf.len(), "Loaded presentation from disk");

        Ok(Artifact {
            info: ArtifactInfo {
                id: id.clone(),
                size: buf.len() as u64,
                created_at: modified_at(&meta),
            },
            bytes: Bytes::from(buf),
        })
    }

    async fn exists(&self, id: &ArtifactId) -> StorageResult<bool> {
        let path = self.path_for(id);
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => match self.kind {
                BackendKind::MountedDisk => self.ensure_root().await.map(|()| false),
                _ => Ok(false),
            },
            Err(e) => Err(StorageError::from_read_io(id.as_str(), &path, e)),
        }
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete(&self, id: &ArtifactId) -> StorageResult<()> {
        let path = self.path_for(id);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "Deleted presentation");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Delete of missing presentation ignored");
                Ok(())
            }
            Err(e) => Err(StorageError::from_write_io(&path, e)),
        }
    }

    async fn list(&self) -> StorageResult<Vec<ArtifactInfo>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return match self.kind {
                    BackendKind::Local => Ok(Vec::new()),
                    _ => Err(self.root_unusable("does not exist")),
                };
            }
            Err(e) => return Err(StorageError::from_read_io("*", &self.root, e)),
        };

        let mut artifacts = Vec::new();
        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => return Err(StorageError::from_read_io("*", &self.root, e)),
            };

            let Some(id) = entry.file_name().to_str().and_then(ArtifactId::from_file_name) else {
                continue;
            };

            match entry.metadata().await {
                Ok(meta) if meta.is_file() => artifacts.push(ArtifactInfo {
                    id,
                    size: meta.len(),
                    created_at: modified_at(&meta),
                }),
                Ok(_) => {}
                // Deleted between read_dir and stat
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(id = %id, error = %e, "Skipping unreadable presentation"),
            }
        }

        Ok(artifacts)
    }
}

fn write_atomically(root: &Path, dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(root)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

fn modified_at(meta: &std::fs::Metadata) -> DateTime<Utc> {
    meta.modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::Arc;
    use tokio_test::assert_ok;

    fn id(raw: &str) -> ArtifactId {
        ArtifactId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_local() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::local(dir.path().join("presentations"));

        let payload = Bytes::from_static(b"PK\x03\x04 fake pptx");
        let info = assert_ok!(backend.save(&id("demo123"), payload.clone()).await);
        assert_eq!(info.size, payload.len() as u64);

        let artifact = assert_ok!(backend.load(&id("demo123")).await);
        assert_eq!(artifact.bytes, payload);
        assert_eq!(artifact.info.size, payload.len() as u64);
        assert!(dir.path().join("presentations/demo123.pptx").is_file());
    }

    #[tokio::test]
    async fn test_round_trip_mounted() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::mounted(dir.path());

        let payload = Bytes::from(vec![7u8; 4096]);
        assert_ok!(backend.save(&id("deck"), payload.clone()).await);
        assert!(assert_ok!(backend.exists(&id("deck")).await));
        assert_eq!(assert_ok!(backend.load(&id("deck")).await).bytes, payload);
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::mounted(dir.path());

        let err = backend.load(&id("never-saved")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(ref missing) if missing == "never-saved"));
        assert!(!assert_ok!(backend.exists(&id("never-saved")).await));
    }

    #[tokio::test]
    async fn test_delete_then_load_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::local(dir.path());

        assert_ok!(backend.save(&id("gone"), Bytes::from_static(b"x")).await);
        assert_ok!(backend.delete(&id("gone")).await);
        assert!(matches!(
            backend.load(&id("gone")).await,
            Err(StorageError::NotFound(_))
        ));

        // Deleting again is a no-op
        assert_ok!(backend.delete(&id("gone")).await);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::local(dir.path());

        assert_ok!(backend.save(&id("deck"), Bytes::from_static(b"first")).await);
        assert_ok!(backend.save(&id("deck"), Bytes::from_static(b"second")).await);
        assert_eq!(
            assert_ok!(backend.load(&id("deck")).await).bytes,
            Bytes::from_static(b"second")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_id_saves_never_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FilesystemBackend::mounted(dir.path()));
        let a = Bytes::from(vec![0xAA; 256 * 1024]);
        let b = Bytes::from(vec![0xBB; 256 * 1024]);

        let writes = (0..16).map(|i| {
            let backend = Arc::clone(&backend);
            let payload = if i % 2 == 0 { a.clone() } else { b.clone() };
            tokio::spawn(async move { backend.save(&id("contended"), payload).await })
        });
        for result in join_all(writes).await {
            assert_ok!(result.unwrap());
        }

        let stored = assert_ok!(backend.load(&id("contended")).await).bytes;
        assert!(stored == a || stored == b, "stored bytes mix both payloads");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("contended.pptx")]);
    }

    #[tokio::test]
    async fn test_list_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::mounted(dir.path());

        assert_ok!(backend.save(&id("one"), Bytes::from_static(b"1")).await);
        assert_ok!(backend.save(&id("two"), Bytes::from_static(b"22")).await);
        std::fs::write(dir.path().join(".abc.partial"), b"half").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hi").unwrap();
        std::fs::create_dir(dir.path().join("nested.pptx")).unwrap();

        let mut listed = assert_ok!(backend.list().await);
        listed.sort_by(|l, r| l.id.cmp(&r.id));
        let ids: Vec<_> = listed.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["one", "two"]);
        assert_eq!(listed[1].size, 2);
    }

    #[tokio::test]
    async fn test_local_creates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("a/b/c");
        let backend = FilesystemBackend::local(&root);

        assert!(assert_ok!(backend.list().await).is_empty());
        assert_ok!(backend.verify().await);
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn test_mounted_missing_root_fails_without_creating_it() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("not-mounted");
        let backend = FilesystemBackend::mounted(&root);

        let err = backend.verify().await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("mount path"));
        assert!(message.contains(&root.display().to_string()));

        let err = backend
            .save(&id("deck"), Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Write { .. }));
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_detached_mount_is_not_reported_as_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("vol");
        std::fs::create_dir(&root).unwrap();
        let backend = FilesystemBackend::mounted(&root);

        assert_ok!(backend.save(&id("deck"), Bytes::from_static(b"deck")).await);
        std::fs::remove_dir_all(&root).unwrap();

        let err = backend.load(&id("deck")).await.unwrap_err();
        assert!(matches!(err, StorageError::Write { .. }), "{err:?}");
        assert!(err.to_string().contains("does not exist"), "{err}");
        assert!(err.to_string().contains(&root.display().to_string()));

        let err = backend.exists(&id("deck")).await.unwrap_err();
        assert!(matches!(err, StorageError::Write { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_directory_named_like_artifact_is_not_an_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::mounted(dir.path());
        std::fs::create_dir(dir.path().join("odd.pptx")).unwrap();

        assert!(!assert_ok!(backend.exists(&id("odd")).await));
        let err = backend.load(&id("odd")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(ref missing) if missing == "odd"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_mounted_root_must_be_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain-file");
        std::fs::write(&file, b"").unwrap();

        let err = FilesystemBackend::mounted(&file).verify().await.unwrap_err();
        assert!(err.to_string().contains("is not a directory"));
    }
}
