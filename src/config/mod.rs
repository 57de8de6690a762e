//! Configuration module for the presentation server
//!
//! Raw settings are read once at startup and resolved into an immutable
//! [`StorageConfig`]. Nothing re-reads the environment afterwards.

use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::storage::{BackendKind, StorageError};

/// Raw settings as they arrive from files and the environment
///
/// Field names match the environment variable names (`STORAGE_TYPE` → `storage_type`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,

    pub storage_type: String,
    pub disk_path: Option<PathBuf>,
    pub presentations_dir: PathBuf,

    pub base_url: Option<String>,
    pub render_external_url: Option<String>,
    pub render_service_url: Option<String>,

    pub s3_bucket_name: Option<String>,
    pub s3_region: String,
    pub s3_endpoint_url: Option<String>,
    pub s3_key_prefix: String,
    pub s3_timeout_secs: u64,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,

    pub max_upload_bytes: usize,
    pub health_probe_interval_secs: u64,
}

/// Static access keys for the object store
#[derive(Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Object store parameters
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub bucket: String,
    pub region: String,
    /// `None` means the default AWS credential chain
    pub credentials: Option<StaticCredentials>,
    pub endpoint_url: Option<String>,
    pub key_prefix: String,
    pub timeout: Duration,
}

/// Backend selection with its required parameters
#[derive(Debug, Clone)]
pub enum BackendConfig {
    Local { root: PathBuf },
    MountedDisk { root: PathBuf },
    ObjectStore(ObjectStoreConfig),
}

impl BackendConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::Local { .. } => BackendKind::Local,
            BackendConfig::MountedDisk { .. } => BackendKind::MountedDisk,
            BackendConfig::ObjectStore(_) => BackendKind::ObjectStore,
        }
    }
}

/// Immutable storage configuration, resolved once per process
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: BackendConfig,
    /// Explicit public base address, if the operator gave one
    pub base_url: Option<String>,
    /// Public address announced by the hosting platform
    pub platform_url: Option<String>,
}

impl Settings {
    /// Load configuration from files and environment variables
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables (`STORAGE_TYPE`, `DISK_PATH`, ...), including `.env`
    /// 2. config/local.toml (gitignored)
    /// 3. config/default.toml
    /// 4. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));

        Self::defaults()?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8000)?
            .set_default("storage_type", "disk")?
            .set_default("presentations_dir", "./presentations")?
            .set_default("s3_region", "us-east-1")?
            .set_default("s3_key_prefix", "presentations/")?
            .set_default("s3_timeout_secs", 30)?
            .set_default("max_upload_bytes", 50 * 1024 * 1024)?
            .set_default("health_probe_interval_secs", 30)
    }

    /// Build settings from explicit key/value overrides on top of the defaults
    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Result<Self, ConfigError> {
        let mut builder = Self::defaults()?;
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value)?;
        }
        builder.build()?.try_deserialize()
    }

    /// Resolve the raw settings into the storage configuration.
    ///
    /// Fails when the selected backend is missing a required parameter, so a broken
    /// deployment stops at boot instead of at the first upload.
    pub fn storage_config(&self) -> Result<StorageConfig, StorageError> {
        let kind: BackendKind = self.storage_type.parse()?;

        let backend = match kind {
            BackendKind::Local => BackendConfig::Local {
                root: self.presentations_dir.clone(),
            },
            BackendKind::MountedDisk => {
                let root = self.disk_path.clone().ok_or_else(|| {
                    StorageError::Configuration(
                        "STORAGE_TYPE=disk requires DISK_PATH (or set STORAGE_TYPE=local for development)"
                            .to_string(),
                    )
                })?;
                if !root.is_absolute() {
                    return Err(StorageError::Configuration(format!(
                        "DISK_PATH must be an absolute path, got '{}'",
                        root.display()
                    )));
                }
                BackendConfig::MountedDisk { root }
            }
            BackendKind::ObjectStore => BackendConfig::ObjectStore(self.object_store_config()?),
        };

        Ok(StorageConfig {
            backend,
            base_url: non_empty(&self.base_url),
            platform_url: non_empty(&self.render_external_url)
                .or_else(|| non_empty(&self.render_service_url)),
        })
    }

    fn object_store_config(&self) -> Result<ObjectStoreConfig, StorageError> {
        let bucket = non_empty(&self.s3_bucket_name).ok_or_else(|| {
            StorageError::Configuration("STORAGE_TYPE=s3 requires S3_BUCKET_NAME".to_string())
        })?;

        let credentials = match (
            non_empty(&self.aws_access_key_id),
            non_empty(&self.aws_secret_access_key),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                access_key_id,
                secret_access_key,
            }),
            (None, None) => None,
            _ => {
                return Err(StorageError::Configuration(
                    "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together".to_string(),
                ))
            }
        };

        if self.s3_timeout_secs == 0 {
            return Err(StorageError::Configuration(
                "S3_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(ObjectStoreConfig {
            bucket,
            region: self.s3_region.clone(),
            credentials,
            endpoint_url: non_empty(&self.s3_endpoint_url),
            key_prefix: self.s3_key_prefix.clone(),
            timeout: Duration::from_secs(self.s3_timeout_secs),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn health_probe_interval(&self) -> Duration {
        Duration::from_secs(self.health_probe_interval_secs)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
