//! Storage backend selection type.
//!
//! Lives in depot-core (rather than depot-storage) so configuration can name a
//! backend without depending on the storage crate.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Which object storage backend the service runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Local filesystem storage with application-signed download URLs.
    Local,
    /// S3-compatible object storage (AWS S3, MinIO, ...).
    S3,
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::Local => write!(f, "local"),
            StorageBackend::S3 => write!(f, "s3"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "s3" => Ok(StorageBackend::S3),
            _ => Err(anyhow::anyhow!(
                "Invalid storage backend: {} (expected 'local' or 's3')",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_roundtrip() {
        assert_eq!("local".parse::<StorageBackend>().unwrap(), StorageBackend::Local);
        assert_eq!("S3".parse::<StorageBackend>().unwrap(), StorageBackend::S3);
        assert!("gcs".parse::<StorageBackend>().is_err());
        assert_eq!(StorageBackend::Local.to_string(), "local");
    }
}
