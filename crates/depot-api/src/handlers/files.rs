//! File handlers: metadata fetch, status polling, retry, listing, deletion.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use depot_core::models::{FileRecord, MetaMap, TaskState};
use depot_core::AppError;

/// Client-facing view of a file record.
///
/// The credential is intentionally omitted: it is supplied by the caller and
/// must never be echoed back.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileResponse {
    pub id: Uuid,
    pub upload_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub detail: Option<MetaMap>,
    pub task_id: Uuid,
    pub appointment_id: String,
    pub created_at: DateTime<Utc>,
    /// Direct URL for public files; time-boxed signed URL for gated ones
    pub download_url: String,
}

impl FileResponse {
    pub fn from_record(record: FileRecord, download_url: String) -> Self {
        Self {
            id: record.id,
            upload_id: record.upload_id,
            filename: record.filename,
            content_type: record.content_type,
            size: record.size,
            path: record.path,
            detail: record.detail,
            task_id: record.task_id,
            appointment_id: record.appointment_id,
            created_at: record.created_at,
            download_url,
        }
    }
}

/// Assembly status of a file
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub id: Uuid,
    pub task_id: Uuid,
    #[schema(value_type = String, example = "SUCCESS")]
    pub status: TaskState,
}

#[derive(Debug, Deserialize)]
pub struct CredentialQuery {
    /// JSON object, e.g. `{"pin":"1234"}`, URL-encoded in the query string
    pub credential: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RetryRequest {
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub credential: Option<MetaMap>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub appointment_id: Option<String>,
}

fn parse_credential(query: &CredentialQuery) -> Result<Option<MetaMap>, AppError> {
    match query.credential.as_deref() {
        None | Some("") => Ok(None),
        Some(raw) => serde_json::from_str::<MetaMap>(raw)
            .map(Some)
            .map_err(|e| AppError::InvalidInput(format!("Malformed credential: {}", e))),
    }
}

/// Get file metadata and its download URL
#[utoipa::path(
    get,
    path = "/api/v0/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID"),
        ("credential" = Option<String>, Query, description = "JSON credential map for gated files")
    ),
    responses(
        (status = 200, description = "File metadata", body = FileResponse),
        (status = 403, description = "Credential mismatch", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<CredentialQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let credential = parse_credential(&query)?;
    let record = state.upload_service.get_file(id, credential.as_ref()).await?;
    let download_url = state.upload_service.download_url(&record).await?;
    Ok(Json(FileResponse::from_record(record, download_url)))
}

/// Get the assembly status of a file
#[utoipa::path(
    get,
    path = "/api/v0/files/{id}/status",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID"),
        ("credential" = Option<String>, Query, description = "JSON credential map for gated files")
    ),
    responses(
        (status = 200, description = "Current task state", body = StatusResponse),
        (status = 403, description = "Credential mismatch", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<CredentialQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let credential = parse_credential(&query)?;
    let (record, status) = state.upload_service.status(id, credential.as_ref()).await?;

    Ok(Json(StatusResponse {
        id: record.id,
        task_id: record.task_id,
        status,
    }))
}

/// Retry a failed assembly under its original task id
#[utoipa::path(
    post,
    path = "/api/v0/files/{id}/retry",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    request_body = RetryRequest,
    responses(
        (status = 200, description = "Retry dispatched; unchanged metadata", body = FileResponse),
        (status = 403, description = "Credential mismatch", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 409, description = "Already uploaded or still in progress", body = ErrorResponse)
    )
)]
pub async fn retry_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: Option<ValidatedJson<RetryRequest>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let credential = body.and_then(|ValidatedJson(req)| req.credential);
    let record = state.upload_service.retry(id, credential.as_ref()).await?;
    let download_url = state.upload_service.download_url(&record).await?;
    Ok(Json(FileResponse::from_record(record, download_url)))
}

/// Delete a file: best-effort object removal, then the record
#[utoipa::path(
    delete,
    path = "/api/v0/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Deleted file metadata", body = FileResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .upload_service
        .delete_file(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File not found: {}", id)))?;

    // The object is gone; report the last known path instead of a URL.
    let path = record.path.clone();
    Ok(Json(FileResponse::from_record(record, path)))
}

/// List files, optionally scoped to one appointment
#[utoipa::path(
    get,
    path = "/api/v0/files",
    tag = "files",
    params(
        ("appointment_id" = Option<String>, Query, description = "Restrict to one appointment")
    ),
    responses(
        (status = 200, description = "File records (download URLs omitted)")
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let records = match query.appointment_id.as_deref() {
        Some(appointment_id) => {
            state
                .upload_service
                .files_by_appointment(appointment_id)
                .await?
        }
        None => state.upload_service.list_files().await?,
    };

    // Listing is an inspection surface: serve paths, not download URLs, so
    // gated files stay gated.
    let responses: Vec<FileResponse> = records
        .into_iter()
        .map(|record| {
            let path = record.path.clone();
            FileResponse::from_record(record, path)
        })
        .collect();

    Ok(Json(serde_json::json!({
        "count": responses.len(),
        "files": responses,
    })))
}
