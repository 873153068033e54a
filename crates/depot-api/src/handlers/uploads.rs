//! Chunked upload handlers: session init, chunk staging, completion.

use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::files::FileResponse;
use crate::services::upload::CompleteUpload;
use crate::state::AppState;
use depot_core::models::MetaMap;
use depot_core::AppError;

/// Response for starting an upload session
#[derive(Debug, Serialize, ToSchema)]
pub struct InitUploadResponse {
    /// Upload session ID; also the handle for chunk and completion calls
    pub upload_id: Uuid,
    /// Maximum accepted chunk size in bytes
    pub chunk_size: usize,
}

/// Acknowledgement for a staged chunk
#[derive(Debug, Serialize, ToSchema)]
pub struct ChunkAck {
    pub upload_id: Uuid,
    /// Chunk index (0-based)
    pub chunk_index: u32,
}

/// Request to complete an upload and dispatch assembly
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CompleteUploadRequest {
    /// Number of chunks staged for this session
    #[validate(range(min = 1))]
    pub total_chunks: u32,
    /// Declared size of the assembled file in bytes
    pub total_size: i64,
    /// Extension of the final object (e.g. "pdf")
    #[validate(length(min = 1, max = 16))]
    pub file_extension: String,
    #[validate(length(min = 1, max = 255))]
    pub content_type: String,
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    /// Recorded file size in bytes
    pub size: i64,
    /// Optional access credential; presence makes the file private
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub credential: Option<MetaMap>,
    /// Optional opaque metadata, stored unchanged
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub detail: Option<MetaMap>,
    #[validate(length(min = 1, max = 255))]
    pub appointment_id: String,
}

/// Start an upload session
#[utoipa::path(
    post,
    path = "/api/v0/uploads/init",
    tag = "uploads",
    responses(
        (status = 200, description = "Upload session created", body = InitUploadResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn init_upload(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let upload_id = state.upload_service.initialize().await?;

    Ok(Json(InitUploadResponse {
        upload_id,
        chunk_size: state.config.max_chunk_size_bytes,
    }))
}

/// Stage one chunk of an upload session
#[utoipa::path(
    post,
    path = "/api/v0/uploads/{upload_id}/chunks/{chunk_index}",
    tag = "uploads",
    params(
        ("upload_id" = Uuid, Path, description = "Upload session ID"),
        ("chunk_index" = u32, Path, description = "Chunk index (0-based)")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Chunk staged", body = ChunkAck),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 422, description = "Chunk exceeds maximum size", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn upload_chunk(
    State(state): State<Arc<AppState>>,
    Path((upload_id, chunk_index)): Path<(Uuid, u32)>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut chunk: Option<axum::body::Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Failed to read chunk data: {}", e)))?;
            chunk = Some(data);
            break;
        }
    }

    let data =
        chunk.ok_or_else(|| AppError::InvalidInput("Missing 'file' multipart field".to_string()))?;

    state
        .upload_service
        .write_chunk(upload_id, chunk_index, &data)
        .await?;

    Ok(Json(ChunkAck {
        upload_id,
        chunk_index,
    }))
}

/// Complete an upload and dispatch assembly
#[utoipa::path(
    post,
    path = "/api/v0/uploads/{upload_id}/complete",
    tag = "uploads",
    params(
        ("upload_id" = Uuid, Path, description = "Upload session ID")
    ),
    request_body = CompleteUploadRequest,
    responses(
        (status = 200, description = "Assembly dispatched; metadata of the (possibly in-flight) file", body = FileResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn complete_upload(
    State(state): State<Arc<AppState>>,
    Path(upload_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CompleteUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;

    let record = state
        .upload_service
        .complete(CompleteUpload {
            upload_id,
            total_chunks: request.total_chunks,
            total_size: request.total_size,
            file_extension: request.file_extension,
            content_type: request.content_type,
            filename: request.filename,
            size: request.size,
            credential: request.credential,
            detail: request.detail,
            appointment_id: request.appointment_id,
        })
        .await?;

    let download_url = state.upload_service.download_url(&record).await?;
    Ok(Json(FileResponse::from_record(record, download_url)))
}
