//! Blob storage abstraction for uploaded documents and generated thumbnails.
//!
//! Keys are path-like strings (`uploads/{owner}/{file}`); thumbnail keys are
//! derived deterministically from source keys via [`keys::thumbnail_key`].

pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

#[cfg(feature = "storage-local")]
pub use local::LocalBlobStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3BlobStore;
pub use traits::{BlobStore, StorageError, StorageResult};
