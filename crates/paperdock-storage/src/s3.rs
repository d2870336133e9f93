//! S3 blob store.
//!
//! Works against AWS S3 and S3-compatible providers (MinIO, Spaces) via a
//! custom endpoint.

use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::{Error as ObjectStoreError, ObjectStoreExt, PutPayload};
use std::path::Path;
use std::time::Duration;

use crate::traits::{BlobStore, StorageError, StorageResult};

#[derive(Clone)]
pub struct S3BlobStore {
    store: AmazonS3,
    bucket: String,
}

impl S3BlobStore {
    /// Credentials are taken from the environment (standard AWS variables).
    /// `endpoint_url` switches to path-style addressing for S3-compatible
    /// providers.
    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self { store, bucket })
    }

    fn map_get_err(&self, key: &str, e: ObjectStoreError) -> StorageError {
        match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => {
                tracing::error!(error = %other, bucket = %self.bucket, key = %key, "S3 read failed");
                StorageError::DownloadFailed(other.to_string())
            }
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        let location = ObjectPath::from(key);
        let start = std::time::Instant::now();

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| self.map_get_err(key, e))?;
        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );
        Ok(bytes.to_vec())
    }

    async fn download_to(&self, key: &str, dest: &Path) -> StorageResult<u64> {
        let data = self.download(key).await?;
        let len = data.len() as u64;
        tokio::fs::write(dest, data).await?;
        Ok(len)
    }

    async fn upload(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        let location = ObjectPath::from(key);
        let size = data.len();
        let start = std::time::Instant::now();

        self.store
            .put(&location, PutPayload::from(Bytes::from(data)))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, bucket = %self.bucket, key = %key, "S3 upload failed");
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );
        Ok(())
    }

    async fn content_length(&self, key: &str) -> StorageResult<u64> {
        let location = ObjectPath::from(key);
        let meta = self
            .store
            .head(&location)
            .await
            .map_err(|e| self.map_get_err(key, e))?;
        Ok(meta.size)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let location = ObjectPath::from(key);
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::DownloadFailed(e.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let location = ObjectPath::from(key);
        match self.store.delete(&location).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(e.to_string())),
        }
    }

    async fn presigned_get_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let location = ObjectPath::from(key);
        let url = self
            .store
            .signed_url(Method::GET, &location, expires_in)
            .await
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;
        Ok(url.to_string())
    }
}
