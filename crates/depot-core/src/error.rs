//! Unified error taxonomy for the upload pipeline.
//!
//! Every fault in the system, whether from the record store, object storage,
//! the task backend, or request validation, flows through [`AppError`]. The
//! [`ErrorMetadata`] trait carries everything the HTTP layer needs to render
//! it without matching on variants itself.
//!
//! The `Database` variant wraps `sqlx::Error` only when the `sqlx` feature is
//! on, so storage- and worker-side crates can depend on depot-core without a
//! database stack.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Severity routing for error logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected client mistakes: validation, missing resources, retry guards.
    Debug,
    Warn,
    /// Faults that need operator attention.
    Error,
}

/// How an error presents over HTTP.
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Stable machine-readable code, e.g. `"SESSION_NOT_FOUND"`.
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same request can succeed.
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// What the client is told. Kept separate from the internal message so
    /// infrastructure detail never leaks.
    fn client_message(&self) -> String;

    /// Sensitive errors never expose their detail chain, even outside
    /// production.
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Task backend error: {0}")]
    TaskBackend(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Chunk of {size} bytes exceeds maximum chunk size of {max} bytes")]
    ChunkTooLarge { size: usize, max: usize },

    #[error("Upload session not found: {0}")]
    SessionNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("File already uploaded: {0}")]
    AlreadyUploaded(String),

    #[error("Upload still in progress: {0}")]
    UploadInProgress(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Storage(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Presentation facts for one variant; `client_message` stays per-variant
/// because it interpolates dynamic content.
struct Meta {
    status: u16,
    code: &'static str,
    recoverable: bool,
    action: Option<&'static str>,
    sensitive: bool,
    level: LogLevel,
}

const fn fault(code: &'static str) -> Meta {
    Meta {
        status: 500,
        code,
        recoverable: true,
        action: Some("Retry after a short delay"),
        sensitive: true,
        level: LogLevel::Error,
    }
}

const fn client_error(status: u16, code: &'static str, action: &'static str) -> Meta {
    Meta {
        status,
        code,
        recoverable: false,
        action: Some(action),
        sensitive: false,
        level: LogLevel::Debug,
    }
}

impl AppError {
    fn meta(&self) -> Meta {
        match self {
            AppError::Database(_) => fault("DATABASE_ERROR"),
            AppError::Storage(_) => fault("STORAGE_FAULT"),
            AppError::TaskBackend(_) => fault("TASK_BACKEND_FAULT"),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                fault("INTERNAL_ERROR")
            }
            AppError::InvalidInput(_) => client_error(
                400,
                "INVALID_INPUT",
                "Check request parameters and try again",
            ),
            AppError::ChunkTooLarge { .. } => client_error(
                422,
                "CHUNK_TOO_LARGE",
                "Split the file into smaller chunks",
            ),
            AppError::SessionNotFound(_) => client_error(
                404,
                "SESSION_NOT_FOUND",
                "Initialize a new upload session",
            ),
            AppError::NotFound(_) => {
                client_error(404, "NOT_FOUND", "Verify the file ID exists")
            }
            AppError::PermissionDenied(_) => client_error(
                403,
                "PERMISSION_DENIED",
                "Supply the credential the file was uploaded with",
            ),
            AppError::AlreadyUploaded(_) => client_error(
                409,
                "ALREADY_UPLOADED",
                "Fetch the file instead of retrying the upload",
            ),
            AppError::UploadInProgress(_) => client_error(
                409,
                "UPLOAD_IN_PROGRESS",
                "Poll the upload status and retry once it is terminal",
            ),
        }
    }

    /// Variant name, for diagnostic responses.
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::TaskBackend(_) => "TaskBackend",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::ChunkTooLarge { .. } => "ChunkTooLarge",
            AppError::SessionNotFound(_) => "SessionNotFound",
            AppError::NotFound(_) => "NotFound",
            AppError::PermissionDenied(_) => "PermissionDenied",
            AppError::AlreadyUploaded(_) => "AlreadyUploaded",
            AppError::UploadInProgress(_) => "UploadInProgress",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// The error and its source chain, one line per cause.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut out = self.to_string();
        let mut cause = self.source();
        let mut depth = 0;
        while let Some(err) = cause {
            depth += 1;
            if depth > 5 {
                out.push_str("\n  ... (truncated)");
                break;
            }
            out.push_str(&format!("\n  Caused by: {}", err));
            cause = err.source();
        }
        out
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        self.meta().status
    }

    fn error_code(&self) -> &'static str {
        self.meta().code
    }

    fn is_recoverable(&self) -> bool {
        self.meta().recoverable
    }

    fn suggested_action(&self) -> Option<&'static str> {
        self.meta().action
    }

    fn is_sensitive(&self) -> bool {
        self.meta().sensitive
    }

    fn log_level(&self) -> LogLevel {
        self.meta().level
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::TaskBackend(_) => "Failed to reach the upload task backend".to_string(),
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::ChunkTooLarge { size, max } => format!(
                "Chunk of {} bytes exceeds maximum chunk size of {} bytes",
                size, max
            ),
            AppError::SessionNotFound(id) => format!("Upload session not found: {}", id),
            AppError::NotFound(msg) => msg.clone(),
            AppError::PermissionDenied(_) => "Permission denied".to_string(),
            AppError::AlreadyUploaded(id) => format!("File {} has already been uploaded", id),
            AppError::UploadInProgress(id) => {
                format!("Upload for file {} is still in progress", id)
            }
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_too_large_presentation() {
        let err = AppError::ChunkTooLarge {
            size: 2048,
            max: 1024,
        };
        assert_eq!(err.http_status_code(), 422);
        assert_eq!(err.error_code(), "CHUNK_TOO_LARGE");
        assert!(!err.is_recoverable());
        assert!(!err.is_sensitive());
        assert!(err.client_message().contains("2048"));
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_permission_denied_hides_internal_detail() {
        let err = AppError::PermissionDenied("credential mismatch for file x".to_string());
        assert_eq!(err.http_status_code(), 403);
        assert_eq!(err.error_code(), "PERMISSION_DENIED");
        assert_eq!(err.client_message(), "Permission denied");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_storage_fault_presentation() {
        let err = AppError::Storage("disk full".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "STORAGE_FAULT");
        assert!(err.is_recoverable());
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Failed to access storage");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_retry_guards_are_conflicts() {
        assert_eq!(
            AppError::AlreadyUploaded("abc".to_string()).http_status_code(),
            409
        );
        assert_eq!(
            AppError::UploadInProgress("abc".to_string()).http_status_code(),
            409
        );
    }

    #[test]
    fn test_detailed_message_walks_source_chain() {
        let err = AppError::InternalWithSource {
            message: "wrapper".to_string(),
            source: anyhow::anyhow!("root cause"),
        };
        assert!(err.detailed_message().contains("root cause"));
    }
}
