//! HTTP rendering of `AppError`.
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`; anything that
//! converts into `AppError` converts into `HttpAppError`, so `?` gives every
//! failure the same status mapping, JSON body, and log treatment.

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, OptionalFromRequest, Request},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use depot_core::{AppError, ErrorMetadata, LogLevel};
use depot_storage::StorageError;
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;

/// JSON error body shared by every endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Full error chain; omitted in production and for sensitive faults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Stable machine-readable code, e.g. `SESSION_NOT_FOUND`
    pub code: String,
    /// Whether retrying the same request can succeed
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Newtype over `AppError` carrying the `IntoResponse` impl; orphan rules
/// keep it out of depot-core.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// `Json<T>` that rejects malformed bodies with the standard [`ErrorResponse`]
/// shape (400) instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = <Json<T> as FromRequest<S>>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(value))
    }
}

/// A request without a Content-Type header extracts as `None`; a body that is
/// present but malformed still fails with a 400.
impl<T, S> OptionalFromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        if req.headers().get(header::CONTENT_TYPE).is_none() {
            return Ok(None);
        }
        <ValidatedJson<T> as FromRequest<S>>::from_request(req, state)
            .await
            .map(Some)
    }
}

fn is_production_env() -> bool {
    let env = std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_default()
        .to_lowercase();
    matches!(env.as_str(), "production" | "prod")
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let err = &self.0;

        match err.log_level() {
            LogLevel::Debug => {
                tracing::debug!(error = %err, error_type = err.error_type(), "Request failed")
            }
            LogLevel::Warn => {
                tracing::warn!(error = %err, error_type = err.error_type(), "Request failed")
            }
            LogLevel::Error => {
                tracing::error!(error = %err, error_type = err.error_type(), "Request failed")
            }
        }

        let status = StatusCode::from_u16(err.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Diagnostics only leave the process outside production, and never
        // for sensitive faults.
        let expose_details = !is_production_env() && !err.is_sensitive();

        let body = ErrorResponse {
            error: err.client_message(),
            details: expose_details.then(|| err.detailed_message()),
            error_type: expose_details.then(|| err.error_type().to_string()),
            code: err.error_code().to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action().map(String::from),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_not_found_maps_to_not_found() {
        let HttpAppError(err) = StorageError::NotFound("public/gone.bin".to_string()).into();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "public/gone.bin"));
    }

    #[test]
    fn test_storage_invalid_signature_maps_to_permission_denied() {
        let HttpAppError(err) =
            StorageError::InvalidSignature("signature mismatch".to_string()).into();
        assert!(matches!(err, AppError::PermissionDenied(_)));
    }

    #[test]
    fn test_storage_fault_maps_to_storage() {
        let HttpAppError(err) = StorageError::UploadFailed("disk full".to_string()).into();
        assert!(matches!(err, AppError::Storage(msg) if msg.contains("disk full")));
    }

    #[test]
    fn test_storage_invalid_key_maps_to_invalid_input() {
        let HttpAppError(err) = StorageError::InvalidKey("bad key".to_string()).into();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_error_response_omits_absent_fields() {
        let body = ErrorResponse {
            error: "Upload session not found: x".to_string(),
            details: None,
            error_type: None,
            code: "SESSION_NOT_FOUND".to_string(),
            recoverable: false,
            suggested_action: Some("Initialize a new upload session".to_string()),
        };
        let json = serde_json::to_value(&body).expect("serialize");

        assert_eq!(json["code"], "SESSION_NOT_FOUND");
        assert_eq!(json["recoverable"], false);
        assert!(json.get("details").is_none());
        assert!(json.get("error_type").is_none());
        assert_eq!(json["suggested_action"], "Initialize a new upload session");
    }
}
