//! S3 object-store backend
//!
//! Works against AWS S3 and S3-compatible stores (R2, MinIO) through aws-sdk-s3.
//!
//! ## Key Layout
//! ```text
//! {bucket}/
//! └── {prefix}                 # default "presentations/"
//!     └── {artifact_id}.pptx
//! ```
//!
//! Every call is bounded by the configured timeout. Network failures and timeouts become
//! retryable [`StorageError::TransientIo`]; a 404 is a definitive
//! [`StorageError::NotFound`]; 401/403 become [`StorageError::AccessDenied`].

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{BehaviorVersion, Builder, Credentials, Region},
    error::{DisplayErrorContext, SdkError},
    primitives::ByteStream,
    Client as S3Client,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::backend::{Artifact, ArtifactInfo, BackendKind, StorageBackend, PPTX_CONTENT_TYPE};
use super::error::{StorageError, StorageResult};
use super::naming::ArtifactId;
use crate::config::ObjectStoreConfig;

/// Presentation storage in an S3 bucket
#[derive(Clone)]
pub struct S3Backend {
    client: S3Client,
    bucket: String,
    prefix: String,
    timeout: Duration,
}

impl S3Backend {
    /// Build a client from the resolved object-store configuration.
    ///
    /// Static keys are used when both halves are configured; otherwise credentials come
    /// from the default AWS provider chain (instance roles, web identity, profiles).
    pub async fn new(config: &ObjectStoreConfig) -> StorageResult<Self> {
        let mut builder = match &config.credentials {
            Some(keys) => {
                let credentials = Credentials::new(
                    &keys.access_key_id,
                    &keys.secret_access_key,
                    None, // session token
                    None, // expiry
                    "pptx-static-credentials",
                );
                Builder::new()
                    .behavior_version(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .credentials_provider(credentials)
            }
            None => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .load()
                    .await;
                Builder::from(&shared)
            }
        };

        if let Some(endpoint) = &config.endpoint_url {
            debug!("Using custom S3 endpoint: {}", endpoint);
            // Path-style addressing is what R2 and MinIO expect
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self {
            client: S3Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            prefix: normalize_prefix(&config.key_prefix),
            timeout: config.timeout,
        })
    }

    fn key_for(&self, id: &ArtifactId) -> String {
        format!("{}{}", self.prefix, id.file_name())
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn kind(&self) -> BackendKind {
        BackendKind::ObjectStore
    }

    fn describe(&self) -> String {
        self.location(&self.prefix)
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn verify(&self) -> StorageResult<()> {
        let target = format!("s3://{}", self.bucket);
        bounded(self.timeout, "head_bucket", &target, async {
            self.client
                .head_bucket()
                .bucket(&self.bucket)
                .send()
                .await
                .map_err(|e| {
                    // A missing bucket is a deployment error, not a missing artifact
                    match classify(e, "head_bucket", &target) {
                        StorageError::NotFound(_) => StorageError::Configuration(format!(
                            "bucket '{}' does not exist",
                            self.bucket
                        )),
                        other => other,
                    }
                })
        })
        .await?;
        debug!("S3 bucket reachable");
        Ok(())
    }

    #[instrument(skip(self, bytes), fields(bucket = %self.bucket, id = %id, size = bytes.len()))]
    async fn save(&self, id: &ArtifactId, bytes: Bytes) -> StorageResult<ArtifactInfo> {
        let key = self.key_for(id);
        let target = self.location(&key);
        let size = bytes.len() as u64;

        bounded(self.timeout, "put_object", &target, async {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .body(ByteStream::from(bytes))
                .content_type(PPTX_CONTENT_TYPE)
                .send()
                .await
                .map_err(|e| match classify(e, "put_object", &target) {
                    // Not-found on a write means the bucket is gone
                    StorageError::NotFound(_) => StorageError::Write {
                        target: target.clone(),
                        message: "bucket not found".to_string(),
                    },
                    other => other,
                })
        })
        .await?;

        info!("Uploaded to S3: {} ({} bytes)", key, size);

        Ok(ArtifactInfo {
            id: id.clone(),
            size,
            created_at: Utc::now(),
        })
    }

    #[instrument(skip(self), fields(bucket = %self.bucket, id = %id))]
    async fn load(&self, id: &ArtifactId) -> StorageResult<Artifact> {
        let key = self.key_for(id);
        let target = self.location(&key);

        let (data, last_modified) = bounded(self.timeout, "get_object", &target, async {
            let output = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| match classify(e, "get_object", &target) {
                    StorageError::NotFound(_) => StorageError::NotFound(id.to_string()),
                    other => other,
                })?;

            let last_modified = output.last_modified().and_then(to_chrono);
            // Body is streamed, so a dropped connection shows up here rather than in send()
            let data = output
                .body
                .collect()
                .await
                .map_err(|e| StorageError::TransientIo {
                    operation: "get_object",
                    target: target.clone(),
                    message: format!("failed to read body: {}", e),
                })?
                .into_bytes();
            Ok::<_, StorageError>((data, last_modified))
        })
        .await?;

        debug!("Downloaded {} bytes from S3: {}", data.len(), key);

        Ok(Artifact {
            info: ArtifactInfo {
                id: id.clone(),
                size: data.len() as u64,
                created_at: last_modified.unwrap_or_else(Utc::now),
            },
            bytes: data,
        })
    }

    #[instrument(skip(self), fields(bucket = %self.bucket, id = %id))]
    async fn exists(&self, id: &ArtifactId) -> StorageResult<bool> {
        let key = self.key_for(id);
        let target = self.location(&key);

        bounded(self.timeout, "head_object", &target, async {
            match self
                .client
                .head_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
            {
                Ok(_) => Ok(true),
                Err(e) => match classify(e, "head_object", &target) {
                    StorageError::NotFound(_) => Ok(false),
                    other => Err(other),
                },
            }
        })
        .await
    }

    #[instrument(skip(self), fields(bucket = %self.bucket, id = %id))]
    async fn delete(&self, id: &ArtifactId) -> StorageResult<()> {
        let key = self.key_for(id);
        let target = self.location(&key);

        bounded(self.timeout, "delete_object", &target, async {
            match self
                .client
                .delete_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
            {
                Ok(_) => Ok(()),
                Err(e) => match classify(e, "delete_object", &target) {
                    StorageError::NotFound(_) => Ok(()),
                    other => Err(other),
                },
            }
        })
        .await?;

        info!("Deleted from S3: {}", key);
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket, prefix = %self.prefix))]
    async fn list(&self) -> StorageResult<Vec<ArtifactInfo>> {
        let target = self.location(&self.prefix);
        let mut artifacts = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&self.prefix);

            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let page = bounded(self.timeout, "list_objects_v2", &target, async {
                request
                    .send()
                    .await
                    .map_err(|e| classify(e, "list_objects_v2", &target))
            })
            .await?;

            for object in page.contents() {
                let Some(id) = object
                    .key()
                    .and_then(|key| key.strip_prefix(self.prefix.as_str()))
                    .and_then(ArtifactId::from_file_name)
                else {
                    continue;
                };
                artifacts.push(ArtifactInfo {
                    id,
                    size: object.size().unwrap_or_default().max(0) as u64,
                    created_at: object
                        .last_modified()
                        .and_then(to_chrono)
                        .unwrap_or_else(Utc::now),
                });
            }

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!("Listed {} presentations in S3", artifacts.len());
        Ok(artifacts)
    }
}

/// Ensure a non-empty prefix ends with exactly one `/` and has no leading `/`
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

fn to_chrono(ts: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

/// Run an S3 call under a deadline; expiry is a retryable failure
async fn bounded<T, F>(
    limit: Duration,
    operation: &'static str,
    target: &str,
    call: F,
) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, target, timeout_ms = limit.as_millis() as u64, "S3 call timed out");
            Err(StorageError::TransientIo {
                operation,
                target: target.to_string(),
                message: format!("timed out after {:?}", limit),
            })
        }
    }
}

/// Map an SDK failure onto the storage taxonomy
fn classify<E>(err: SdkError<E>, operation: &'static str, target: &str) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let status = match &err {
        SdkError::ServiceError(service) => Some(service.raw().status().as_u16()),
        _ => None,
    };
    let message = DisplayErrorContext(&err).to_string();

    match &err {
        SdkError::ConstructionFailure(_) => StorageError::Configuration(format!(
            "could not build {} request for {}: {}",
            operation, target, message
        )),
        SdkError::ServiceError(_) => {
            classify_status(status.unwrap_or(500), operation, target, message)
        }
        // Timeouts, dispatch (connect/DNS) failures and unreadable responses
        _ => StorageError::TransientIo {
            operation,
            target: target.to_string(),
            message,
        },
    }
}

fn classify_status(
    status: u16,
    operation: &'static str,
    target: &str,
    message: String,
) -> StorageError {
    match status {
        404 => StorageError::NotFound(target.to_string()),
        401 | 403 => StorageError::AccessDenied {
            operation,
            target: target.to_string(),
            message,
        },
        408 | 429 | 500..=599 => StorageError::TransientIo {
            operation,
            target: target.to_string(),
            message,
        },
        _ => StorageError::Write {
            target: target.to_string(),
            message: format!("{} rejected with HTTP {}: {}", operation, status, message),
        },
    }
}
