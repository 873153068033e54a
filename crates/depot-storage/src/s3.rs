use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use depot_core::StorageBackend;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};
use std::collections::HashMap;
use std::time::Duration;

/// S3-compatible storage implementation (AWS S3, MinIO, ...).
///
/// One `AmazonS3` client per bucket; the pipeline uses exactly two (public
/// and private), both configured at startup.
#[derive(Clone)]
pub struct S3Store {
    stores: HashMap<String, AmazonS3>,
    region: String,
    endpoint_url: Option<String>,
}

impl S3Store {
    /// Create a new S3Store serving the given buckets.
    ///
    /// # Arguments
    /// * `buckets` - Bucket names the pipeline addresses (public and private)
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        buckets: &[String],
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut stores = HashMap::new();
        for bucket in buckets {
            let mut builder = AmazonS3Builder::from_env()
                .with_region(region.clone())
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
            stores.insert(bucket.clone(), store);
        }

        Ok(S3Store {
            stores,
            region,
            endpoint_url,
        })
    }

    fn store_for(&self, bucket: &str) -> StorageResult<&AmazonS3> {
        self.stores.get(bucket).ok_or_else(|| {
            StorageError::ConfigError(format!("Bucket not configured: {}", bucket))
        })
    }

    /// Public URL for an object.
    ///
    /// For AWS S3 the standard virtual-hosted format; for S3-compatible
    /// providers, path-style against the configured endpoint.
    fn generate_url(&self, bucket: &str, key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, bucket, key)
        } else {
            format!("https://{}.s3.{}.amazonaws.com/{}", bucket, self.region, key)
        }
    }
}

#[async_trait]
impl Storage for S3Store {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<String> {
        let store = self.store_for(bucket)?;
        let size = data.len() as u64;
        let bytes = Bytes::from(data);
        let location = Path::from(key.to_string());
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = store.put(&location, PutPayload::from(bytes)).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 put failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );

        Ok(self.generate_url(bucket, key))
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let store = self.store_for(bucket)?;
        let location = Path::from(key.to_string());
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => {
                StorageError::NotFound(format!("{}/{}", bucket, key))
            }
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 get failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 get successful"
        );

        Ok(bytes.to_vec())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let store = self.store_for(bucket)?;
        let location = Path::from(key.to_string());

        let result: ObjectResult<_> = store.delete(&location).await;

        match result {
            Ok(_) => {
                tracing::info!(bucket = %bucket, key = %key, "S3 delete successful");
                Ok(())
            }
            Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(e) => {
                tracing::error!(error = %e, bucket = %bucket, key = %key, "S3 delete failed");
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let store = self.store_for(bucket)?;
        let location = Path::from(key.to_string());
        match store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.generate_url(bucket, key)
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
        extra_query: &[(String, String)],
    ) -> StorageResult<String> {
        let store = self.store_for(bucket)?;
        let location = Path::from(key.to_string());
        let url_result: ObjectResult<_> = store.signed_url(Method::GET, &location, expires_in).await;

        let mut url = url_result
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        // Extra parameters ride outside the SigV4 signature; the gateway must
        // be configured to ignore unknown query parameters on GET.
        for (k, v) in extra_query {
            url.query_pairs_mut().append_pair(k, v);
        }

        Ok(url.to_string())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
