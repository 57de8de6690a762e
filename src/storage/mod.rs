//! Storage module for generated presentations
//!
//! ```text
//!   PresentationStore ──► ArtifactNamer
//!          │
//!          ├──► StorageRouter ──► StorageBackend
//!          │                       ├── FilesystemBackend (local / mounted disk)
//!          │                       └── S3Backend
//!          └──► UrlResolver
//!
//!   HealthReporter ──► StorageRouter
//! ```
//!
//! Artifacts are kept until explicitly deleted; there is no expiry.

mod backend;
mod error;
mod filesystem;
mod health;
mod naming;
mod router;
mod s3;
mod service;
mod url_resolver;

pub use backend::{BackendKind, PPTX_CONTENT_TYPE};
pub use error::StorageError;
#[cfg(test)]
pub use filesystem::FilesystemBackend;
pub use health::HealthReporter;
pub use naming::ArtifactId;
pub use router::StorageRouter;
pub use service::PresentationStore;
pub use url_resolver::{UrlResolver, PRESENTATIONS_ROUTE};
