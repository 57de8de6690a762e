//! Storage error taxonomy
//!
//! Every backend reports failures through [`StorageError`] so the HTTP layer can map
//! each kind to a status code without inspecting backend-specific details.

use std::io;
use std::path::Path;
use thiserror::Error;

use super::naming::ArtifactIdError;

/// Errors surfaced by the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// Missing or invalid backend parameters. Fatal at startup.
    #[error("Storage configuration error: {0}")]
    Configuration(String),

    /// The artifact is unknown to the active backend.
    #[error("Presentation not found: {0}")]
    NotFound(String),

    /// Network or filesystem hiccup. The caller may retry.
    #[error("Transient storage failure during {operation} of {target}: {message}")]
    TransientIo {
        operation: &'static str,
        target: String,
        message: String,
    },

    /// Permission, space or read-only medium. Fatal for the request and not retryable.
    #[error("Write failed for {target}: {message}")]
    Write { target: String, message: String },

    /// Object store rejected the credentials or the bucket policy.
    #[error("Access denied during {operation} of {target}: {message}")]
    AccessDenied {
        operation: &'static str,
        target: String,
        message: String,
    },

    #[error(transparent)]
    InvalidArtifactId(#[from] ArtifactIdError),

    #[error("Refusing to store an empty presentation")]
    EmptyPayload,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Only transient failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::TransientIo { .. })
    }

    /// Stable machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::Configuration(_) => "STORAGE_MISCONFIGURED",
            StorageError::NotFound(_) => "PRESENTATION_NOT_FOUND",
            StorageError::TransientIo { .. } => "STORAGE_UNAVAILABLE",
            StorageError::Write { .. } => "WRITE_FAILED",
            StorageError::AccessDenied { .. } => "STORAGE_ACCESS_DENIED",
            StorageError::InvalidArtifactId(_) => "PRESENTATION_NOT_FOUND",
            StorageError::EmptyPayload => "EMPTY_PAYLOAD",
        }
    }

    /// Classify an I/O error raised while writing to `path`
    pub(crate) fn from_write_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::Interrupted | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                StorageError::TransientIo {
                    operation: "write",
                    target: path.display().to_string(),
                    message: err.to_string(),
                }
            }
            _ => StorageError::Write {
                target: path.display().to_string(),
                message: err.to_string(),
            },
        }
    }

    /// Classify an I/O error raised while reading `path` for artifact `id`
    ///
    /// Permission errors map to the non-retryable `Write` kind.
    pub(crate) fn from_read_io(id: &str, path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(id.to_string()),
            io::ErrorKind::PermissionDenied => StorageError::Write {
                target: path.display().to_string(),
                message: format!("not readable: {}", err),
            },
            _ => StorageError::TransientIo {
                operation: "read",
                target: path.display().to_string(),
                message: err.to_string(),
            },
        }
    }
}
