//! Configuration module
//!
//! Environment-driven configuration for the upload pipeline: chunk limits,
//! staging location, bucket names, URL signing, task queue sizing, and the
//! storage/database backends.

use std::env;
use std::str::FromStr;

use crate::storage_types::StorageBackend;

// Default limits; overridable through the environment.
const DEFAULT_SERVER_PORT: u16 = 4000;
const DEFAULT_MAX_CHUNK_SIZE_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_PRESIGNED_URL_EXPIRY_SECS: u64 = 15 * 60;
const DEFAULT_TASK_QUEUE_MAX_WORKERS: usize = 4;
const DEFAULT_TASK_QUEUE_POLL_INTERVAL_MS: u64 = 200;
const DEFAULT_TASK_QUEUE_TASK_TIMEOUT_SECS: u64 = 3600;

/// Service configuration, loaded once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,

    // Chunked upload pipeline
    pub max_chunk_size_bytes: usize,
    pub upload_staging_dir: String,
    pub allowed_file_extensions: Vec<String>,

    // Object storage
    pub storage_backend: StorageBackend,
    pub public_bucket: String,
    pub private_bucket: String,
    pub presigned_url_expiry_secs: u64,
    pub local_storage_path: String,
    pub local_storage_base_url: String,
    pub url_signing_secret: String,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,

    // Record store; `None` selects the in-memory repository.
    pub database_url: Option<String>,

    // Task queue
    pub task_queue_max_workers: usize,
    pub task_queue_poll_interval_ms: u64,
    pub task_queue_task_timeout_secs: u64,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, anyhow::Error>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

fn env_list(key: &str, default: &str) -> Vec<String> {
    env_or(key, default)
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let storage_backend = env_or("STORAGE_BACKEND", "local")
            .parse::<StorageBackend>()?;

        let config = Config {
            server_port: env_parse("SERVER_PORT", DEFAULT_SERVER_PORT)?,
            cors_origins: env_list("CORS_ORIGINS", "*"),
            max_chunk_size_bytes: env_parse("MAX_CHUNK_SIZE_BYTES", DEFAULT_MAX_CHUNK_SIZE_BYTES)?,
            upload_staging_dir: env_or("UPLOAD_STAGING_DIR", "/tmp/depot/uploads"),
            allowed_file_extensions: env_list(
                "ALLOWED_FILE_EXTENSIONS",
                "jpg,jpeg,png,gif,webp,pdf,txt,doc,docx,xls,xlsx,mp3,mp4,mov,zip",
            ),
            storage_backend,
            public_bucket: env_or("PUBLIC_BUCKET", "public"),
            private_bucket: env_or("PRIVATE_BUCKET", "private"),
            presigned_url_expiry_secs: env_parse(
                "PRESIGNED_URL_EXPIRY_SECS",
                DEFAULT_PRESIGNED_URL_EXPIRY_SECS,
            )?,
            local_storage_path: env_or("LOCAL_STORAGE_PATH", "/tmp/depot/objects"),
            local_storage_base_url: env_or("LOCAL_STORAGE_BASE_URL", "http://localhost:4000/objects"),
            url_signing_secret: env_or("URL_SIGNING_SECRET", ""),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            database_url: env::var("DATABASE_URL").ok(),
            task_queue_max_workers: env_parse(
                "TASK_QUEUE_MAX_WORKERS",
                DEFAULT_TASK_QUEUE_MAX_WORKERS,
            )?,
            task_queue_poll_interval_ms: env_parse(
                "TASK_QUEUE_POLL_INTERVAL_MS",
                DEFAULT_TASK_QUEUE_POLL_INTERVAL_MS,
            )?,
            task_queue_task_timeout_secs: env_parse(
                "TASK_QUEUE_TASK_TIMEOUT_SECS",
                DEFAULT_TASK_QUEUE_TASK_TIMEOUT_SECS,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_chunk_size_bytes == 0 {
            anyhow::bail!("MAX_CHUNK_SIZE_BYTES must be greater than 0");
        }
        if self.public_bucket == self.private_bucket {
            anyhow::bail!("PUBLIC_BUCKET and PRIVATE_BUCKET must differ");
        }
        if self.storage_backend == StorageBackend::Local && self.url_signing_secret.is_empty() {
            anyhow::bail!("URL_SIGNING_SECRET is required for the local storage backend");
        }
        Ok(())
    }

    /// Bucket for an upload: private when a credential gates the file.
    pub fn bucket_for(&self, gated: bool) -> &str {
        if gated {
            &self.private_bucket
        } else {
            &self.public_bucket
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: 4000,
            cors_origins: vec!["*".to_string()],
            max_chunk_size_bytes: 1024,
            upload_staging_dir: "/tmp/staging".to_string(),
            allowed_file_extensions: vec!["pdf".to_string()],
            storage_backend: StorageBackend::Local,
            public_bucket: "public".to_string(),
            private_bucket: "private".to_string(),
            presigned_url_expiry_secs: 900,
            local_storage_path: "/tmp/objects".to_string(),
            local_storage_base_url: "http://localhost:4000/objects".to_string(),
            url_signing_secret: "secret".to_string(),
            s3_region: None,
            s3_endpoint: None,
            database_url: None,
            task_queue_max_workers: 4,
            task_queue_poll_interval_ms: 200,
            task_queue_task_timeout_secs: 3600,
        }
    }

    #[test]
    fn test_validate_rejects_equal_buckets() {
        let mut config = base_config();
        config.private_bucket = "public".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_signing_secret_for_local() {
        let mut config = base_config();
        config.url_signing_secret = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bucket_for_visibility() {
        let config = base_config();
        assert_eq!(config.bucket_for(true), "private");
        assert_eq!(config.bucket_for(false), "public");
    }
}
