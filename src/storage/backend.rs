//! Backend adapter contract
//!
//! Every storage medium (local directory, mounted disk, object store) implements
//! [`StorageBackend`]. The set of media is closed: [`BackendKind`] enumerates them and the
//! router is the only place that picks one.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::error::{StorageError, StorageResult};
use super::naming::ArtifactId;

/// MIME type of `.pptx` files
pub const PPTX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// The storage media this service knows how to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Process-relative directory, lost on restart
    Local,
    /// Absolute path backed by a persistent volume
    MountedDisk,
    /// S3 or an S3-compatible object store
    ObjectStore,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::MountedDisk => "disk",
            BackendKind::ObjectStore => "s3",
        }
    }

    /// Whether artifacts survive a process restart
    pub fn is_durable(&self) -> bool {
        !matches!(self, BackendKind::Local)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = StorageError;

    /// Parse the `STORAGE_TYPE` value
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "disk" | "mounted-disk" => Ok(BackendKind::MountedDisk),
            "s3" | "object-store" => Ok(BackendKind::ObjectStore),
            other => Err(StorageError::Configuration(format!(
                "unknown STORAGE_TYPE '{}' (expected disk, s3 or local)",
                other
            ))),
        }
    }
}

/// Metadata of a stored presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInfo {
    pub id: ArtifactId,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// A stored presentation with its bytes
#[derive(Debug, Clone)]
pub struct Artifact {
    pub info: ArtifactInfo,
    pub bytes: Bytes,
}

/// Physical storage operations for one medium.
///
/// Semantics shared by all implementations:
/// - `save` overwrites; repeating it with the same bytes is harmless
/// - `load` of an id that was never saved returns [`StorageError::NotFound`]
/// - `delete` of a missing id succeeds
/// - readers never observe a partially written artifact
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Which medium this is
    fn kind(&self) -> BackendKind;

    /// Human readable location, e.g. a directory or `s3://bucket/prefix`
    fn describe(&self) -> String;

    /// Confirm the medium is reachable and usable
    async fn verify(&self) -> StorageResult<()>;

    async fn save(&self, id: &ArtifactId, bytes: Bytes) -> StorageResult<ArtifactInfo>;

    async fn load(&self, id: &ArtifactId) -> StorageResult<Artifact>;

    async fn exists(&self, id: &ArtifactId) -> StorageResult<bool>;

    async fn delete(&self, id: &ArtifactId) -> StorageResult<()>;

    /// All stored presentations, in no particular order
    async fn list(&self) -> StorageResult<Vec<ArtifactInfo>>;
}
