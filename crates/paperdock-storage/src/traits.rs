//! Storage abstraction trait
//!
//! Defines the BlobStore trait that all storage backends implement.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Blob store abstraction.
///
/// The pipeline consumes a narrow surface: download the uploaded source to a
/// local file, upload the rendered thumbnail, and presign read access for the
/// viewer. Backends must not interpret key contents beyond path separators.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Download a blob fully into memory.
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Download a blob to a local file path.
    ///
    /// The destination's parent directory must already exist; the pipeline
    /// scopes it to the per-job scratch directory.
    async fn download_to(&self, key: &str, dest: &Path) -> StorageResult<u64>;

    /// Upload bytes to the given key, overwriting any existing blob.
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Size in bytes of the blob, if it exists.
    async fn content_length(&self, key: &str) -> StorageResult<u64>;

    /// Whether a blob exists at the key.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Delete the blob at the key. Deleting a missing blob is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Generate a presigned/temporary GET URL for direct access.
    async fn presigned_get_url(&self, key: &str, expires_in: Duration) -> StorageResult<String>;
}
