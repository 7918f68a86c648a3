//! File store abstraction for uploaded study files.
//!
//! Uploads are written under an opaque key chosen by the caller (the API
//! builds `{study_id}/{uuid}` keys so display names never reach the
//! backend). Two backends are provided: [`LocalFileStore`] for development
//! and single-node deployments, and [`S3FileStore`] for object storage.
//! Both are reached through the [`FileStore`] trait so handlers and routes
//! stay backend-agnostic.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncRead;

mod local;
mod s3;

pub use local::LocalFileStore;
pub use s3::S3FileStore;

/// Streaming handle returned by [`FileStore::get`].
pub type FileStream = Box<dyn AsyncRead + Send + Unpin>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("s3 error: {0}")]
    S3(String),

    #[error("no stored file under key `{0}`")]
    NotFound(String),

    #[error("invalid store key `{0}`")]
    InvalidKey(String),

    #[error("store configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Backend-agnostic blob store keyed by relative string keys.
///
/// Keys are plain `/`-separated relative paths. Implementations must reject
/// keys that could escape their root (`..` segments, absolute paths).
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store `bytes` under `key`, overwriting any previous content.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Open the content stored under `key` for streaming reads.
    async fn get(&self, key: &str) -> Result<FileStream, StoreError>;

    /// Remove the content under `key`. Deleting a missing key is not an
    /// error so callers can retry safely.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Shared key validation for all backends.
fn validate_key(key: &str) -> Result<(), StoreError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Local,
    S3,
}

/// File store settings, read from the environment at startup.
///
/// | Variable           | Default        | Meaning                              |
/// |--------------------|----------------|--------------------------------------|
/// | `FILE_STORE`       | `local`        | Backend: `local` or `s3`             |
/// | `LOCAL_STORE_ROOT` | `./data/files` | Root directory for the local backend |
/// | `S3_BUCKET`        | (required)     | Bucket name for the s3 backend       |
/// | `S3_KEY_PREFIX`    | (empty)        | Key prefix inside the bucket         |
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub local_root: PathBuf,
    pub s3_bucket: Option<String>,
    pub s3_key_prefix: String,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, StoreError> {
        let backend = match std::env::var("FILE_STORE").as_deref() {
            Err(_) | Ok("local") => StoreBackend::Local,
            Ok("s3") => StoreBackend::S3,
            Ok(other) => {
                return Err(StoreError::Config(format!(
                    "unknown FILE_STORE backend `{other}` (expected `local` or `s3`)"
                )));
            }
        };
        let local_root = std::env::var("LOCAL_STORE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/files"));
        let s3_bucket = std::env::var("S3_BUCKET").ok();
        let s3_key_prefix = std::env::var("S3_KEY_PREFIX").unwrap_or_default();

        if backend == StoreBackend::S3 && s3_bucket.is_none() {
            return Err(StoreError::Config(
                "S3_BUCKET must be set when FILE_STORE=s3".to_string(),
            ));
        }

        Ok(Self { backend, local_root, s3_bucket, s3_key_prefix })
    }

    /// Build the configured backend. The s3 variant loads AWS credentials
    /// and region from the ambient environment.
    pub async fn build(&self) -> Result<Arc<dyn FileStore>, StoreError> {
        match self.backend {
            StoreBackend::Local => {
                let store = LocalFileStore::new(self.local_root.clone()).await?;
                tracing::info!(root = %self.local_root.display(), "using local file store");
                Ok(Arc::new(store))
            }
            StoreBackend::S3 => {
                let bucket = self
                    .s3_bucket
                    .clone()
                    .ok_or_else(|| StoreError::Config("S3_BUCKET is not set".to_string()))?;
                let store = S3FileStore::from_env(bucket.clone(), self.s3_key_prefix.clone()).await;
                tracing::info!(%bucket, "using s3 file store");
                Ok(Arc::new(store))
            }
        }
    }
}
