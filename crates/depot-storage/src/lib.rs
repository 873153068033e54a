//! Depot Storage Library
//!
//! Object storage abstraction and implementations for the upload pipeline,
//! plus the filesystem chunk staging area that upload sessions write into.
//!
//! # Paths and keys
//!
//! Objects are addressed by `(bucket, object_key)`. Buckets are flat
//! namespaces (a public and a private one in the default deployment); object
//! keys are derived from the upload session id and must not contain `..` or a
//! leading `/`.

#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod sign;
pub mod staging;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-local")]
pub use local::LocalStore;
pub use depot_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Store;
pub use sign::UrlSigner;
pub use staging::ChunkStore;
pub use traits::{Storage, StorageError, StorageResult};
