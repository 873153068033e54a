//! Storage abstraction trait
//!
//! This module defines the Storage trait that all object storage backends
//! must implement.

use async_trait::async_trait;
use depot_core::StorageBackend;
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

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for depot_core::AppError {
    fn from(err: StorageError) -> Self {
        use depot_core::AppError;
        match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::InvalidSignature(msg) => AppError::PermissionDenied(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Object storage abstraction
///
/// All backends (local filesystem, S3-compatible) implement this trait so the
/// upload pipeline can assemble, fetch, and delete objects without coupling
/// to a backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload data to `bucket/key`, overwriting any existing object.
    /// Returns the public URL of the uploaded object. The write must be
    /// durable before this returns.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<String>;

    /// Download an object.
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Delete an object. Deleting a nonexistent object is not an error.
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Check whether an object exists.
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;

    /// Direct, non-expiring URL for an object in a public bucket.
    fn public_url(&self, bucket: &str, key: &str) -> String;

    /// Time-boxed, read-only presigned URL.
    ///
    /// `extra_query` parameters are carried on the URL and covered by the
    /// signature, which is how per-download credential scoping works.
    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
        extra_query: &[(String, String)],
    ) -> StorageResult<String>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
