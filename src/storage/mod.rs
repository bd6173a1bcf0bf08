//! Object storage: where templates come from and certificates go to.
//!
//! The pipeline only needs two operations, so the backend is a small
//! [`ObjectStore`] trait object injected through
//! [`crate::config::GenerationConfig`]. Two backends ship with the crate:
//!
//! * [`S3Store`]: any S3-compatible endpoint (AWS, MinIO) via `aws-sdk-s3`.
//! * [`LocalStore`]: a directory tree where `bucket/key` maps to a file.
//!
//! [`StorageConfig`] is the JSON connection document accepted by the CLI.

mod local;
mod s3;

pub use local::LocalStore;
pub use s3::S3Store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::error::CertgenError;

/// Default bucket, matching the deployment the tool was written for.
pub const DEFAULT_BUCKET: &str = "public";

/// Default region sent to S3-compatible endpoints that ignore it.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Errors surfaced by an [`ObjectStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// The bucket/key pair does not exist.
    #[error("object '{bucket}/{key}' not found")]
    NotFound { bucket: String, key: String },

    /// Credentials were rejected.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Network, endpoint or service failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Local file-system failure while staging the object.
    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transport(_))
    }
}

/// The two storage capabilities the pipeline uses.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download `bucket/key` to `dest`, returning the number of bytes written.
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64, StorageError>;

    /// Upload `body` to `bucket/key`.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;
}

/// Which backend a [`StorageConfig`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    S3,
    Local,
}

/// JSON storage-connection parameters.
///
/// ```json
/// { "endpoint": "localhost:9000", "access_key": "minio", "secret_key": "minio123",
///   "secure": false, "bucket": "public" }
/// ```
///
/// With `"backend": "local"` only `root` is required.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Host[:port] or full URL of the S3 endpoint. When absent the ambient
    /// AWS configuration (env, profile, IMDS) decides.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Use https for a scheme-less `endpoint`.
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    /// Root directory for the local backend.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("secure", &self.secure)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("root", &self.root)
            .finish()
    }
}

impl StorageConfig {
    /// Parse and validate the JSON connection document.
    pub fn from_json(json: &str) -> Result<Self, CertgenError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| CertgenError::Config(format!("storage JSON is not valid JSON: {e}")))?;
        if !value.is_object() {
            return Err(CertgenError::Config(
                "storage JSON must be an object".into(),
            ));
        }
        let config: StorageConfig = serde_json::from_value(value)
            .map_err(|e| CertgenError::Config(format!("storage JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the fields the selected backend needs.
    ///
    /// - `s3`: `access_key` and `secret_key` come as a pair (or both absent)
    /// - `local`: requires `root`
    pub fn validate(&self) -> Result<(), CertgenError> {
        match self.backend {
            BackendKind::S3 => {
                reject_empty(&self.endpoint, "endpoint")?;
                reject_empty(&self.access_key, "access_key")?;
                reject_empty(&self.secret_key, "secret_key")?;
                if self.access_key.is_some() != self.secret_key.is_some() {
                    return Err(CertgenError::Config(
                        "storage JSON: 'access_key' and 'secret_key' must be given together"
                            .into(),
                    ));
                }
            }
            BackendKind::Local => {
                if self.root.is_none() {
                    return Err(CertgenError::Config(
                        "storage backend 'local' requires a 'root' directory".into(),
                    ));
                }
            }
        }
        reject_empty(&self.bucket, "bucket")
    }

    /// Bucket name, defaulting to [`DEFAULT_BUCKET`].
    pub fn bucket(&self) -> &str {
        self.bucket.as_deref().unwrap_or(DEFAULT_BUCKET)
    }

    /// Endpoint as a URL, adding `http://` or `https://` when missing.
    pub fn endpoint_url(&self) -> Option<String> {
        self.endpoint.as_ref().map(|e| {
            if e.starts_with("http://") || e.starts_with("https://") {
                e.clone()
            } else if self.secure {
                format!("https://{e}")
            } else {
                format!("http://{e}")
            }
        })
    }

    /// Build the configured backend.
    pub async fn connect(&self) -> Result<Arc<dyn ObjectStore>, CertgenError> {
        self.validate()?;
        match self.backend {
            BackendKind::S3 => Ok(Arc::new(S3Store::from_config(self).await)),
            BackendKind::Local => {
                let root = self.root.clone().ok_or_else(|| {
                    CertgenError::Config("storage backend 'local' requires a 'root'".into())
                })?;
                Ok(Arc::new(LocalStore::new(root)))
            }
        }
    }
}

/// Helper: a present string field must not be blank.
fn reject_empty(field: &Option<String>, name: &str) -> Result<(), CertgenError> {
    match field {
        Some(s) if s.trim().is_empty() => Err(CertgenError::Config(format!(
            "storage JSON field '{name}' must not be empty"
        ))),
        _ => Ok(()),
    }
}
