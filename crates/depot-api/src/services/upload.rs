//! Upload pipeline service.
//!
//! Owns the full lifecycle of a chunked upload: session initialization,
//! chunk staging, assembly dispatch, status tracking, retry, access-gated
//! fetches, and deletion. Handlers are thin wrappers over this service.

use std::sync::Arc;
use std::time::Duration;

use depot_core::models::{
    credential_query_params, AssembleArgs, FileRecord, MetaMap, NewFileRecord, TaskState,
};
use depot_core::{AppError, Config};
use depot_db::FileRepository;
use depot_storage::{ChunkStore, Storage, StorageError};
use depot_worker::TaskQueue;
use uuid::Uuid;

/// Parameters of a completion request, validated at the HTTP layer.
#[derive(Debug, Clone)]
pub struct CompleteUpload {
    pub upload_id: Uuid,
    pub total_chunks: u32,
    /// Declared size of the assembled file, informational.
    pub total_size: i64,
    pub file_extension: String,
    pub content_type: String,
    pub filename: String,
    pub size: i64,
    pub credential: Option<MetaMap>,
    pub detail: Option<MetaMap>,
    pub appointment_id: String,
}

pub struct UploadService {
    config: Config,
    repository: Arc<dyn FileRepository>,
    storage: Arc<dyn Storage>,
    chunks: ChunkStore,
    queue: Arc<TaskQueue>,
}

impl UploadService {
    pub fn new(
        config: Config,
        repository: Arc<dyn FileRepository>,
        storage: Arc<dyn Storage>,
        chunks: ChunkStore,
        queue: Arc<TaskQueue>,
    ) -> Self {
        Self {
            config,
            repository,
            storage,
            chunks,
            queue,
        }
    }

    /// Start a new upload session: allocate its id and create the staging
    /// directory. Only fails on staging I/O.
    pub async fn initialize(&self) -> Result<Uuid, AppError> {
        let upload_id = Uuid::new_v4();
        self.chunks.create_session(upload_id).await?;

        tracing::info!(upload_id = %upload_id, "Upload session initialized");
        Ok(upload_id)
    }

    /// Stage one chunk. Oversized payloads are rejected before anything is
    /// written; re-sent indices overwrite (last write wins).
    pub async fn write_chunk(
        &self,
        upload_id: Uuid,
        chunk_index: u32,
        data: &[u8],
    ) -> Result<(), AppError> {
        if data.len() > self.config.max_chunk_size_bytes {
            return Err(AppError::ChunkTooLarge {
                size: data.len(),
                max: self.config.max_chunk_size_bytes,
            });
        }

        self.chunks
            .write_chunk(upload_id, chunk_index, data)
            .await
            .map_err(|e| match e {
                StorageError::NotFound(_) => AppError::SessionNotFound(upload_id.to_string()),
                other => other.into(),
            })
    }

    /// Dispatch assembly for a finished session and persist its file record.
    ///
    /// Idempotent on `upload_id`: a repeated call returns the existing record
    /// and submits nothing. Does not wait for assembly; the returned record's
    /// object may not exist yet.
    pub async fn complete(&self, req: CompleteUpload) -> Result<FileRecord, AppError> {
        if let Some(existing) = self.repository.find_by_upload_id(req.upload_id).await? {
            tracing::info!(
                upload_id = %req.upload_id,
                file_id = %existing.id,
                "Completion replay, returning existing record"
            );
            return Ok(existing);
        }

        let extension = normalize_extension(&req.file_extension);
        if !self.config.allowed_file_extensions.contains(&extension) {
            return Err(AppError::InvalidInput(format!(
                "File extension '{}' is not allowed",
                extension
            )));
        }

        if !self.chunks.session_exists(req.upload_id).await {
            return Err(AppError::SessionNotFound(req.upload_id.to_string()));
        }

        let gated = req.credential.as_ref().is_some_and(|c| !c.is_empty());
        let bucket = self.config.bucket_for(gated).to_string();
        let object_key = format!("{}.{}", req.upload_id, extension);

        let args = AssembleArgs {
            bucket: bucket.clone(),
            upload_id: req.upload_id,
            total_chunks: req.total_chunks,
            object_key: object_key.clone(),
            content_type: req.content_type.clone(),
        };
        let task_id = self.queue.submit(args.to_payload()?).await;

        let new_record = NewFileRecord {
            upload_id: req.upload_id,
            filename: req.filename,
            content_type: req.content_type,
            size: req.size,
            path: format!("{}/{}", bucket, object_key),
            credential: req.credential,
            detail: req.detail,
            task_id,
            appointment_id: req.appointment_id,
        };

        let record = match self.repository.create(new_record).await {
            Ok(record) => record,
            Err(create_err) => {
                // A concurrent completion may have won the unique-constraint
                // race; its record is authoritative and our task is orphaned.
                if let Some(existing) = self.repository.find_by_upload_id(req.upload_id).await? {
                    tracing::warn!(
                        upload_id = %req.upload_id,
                        orphaned_task_id = %task_id,
                        "Concurrent completion won the record race, assembly task orphaned"
                    );
                    return Ok(existing);
                }
                tracing::error!(
                    upload_id = %req.upload_id,
                    orphaned_task_id = %task_id,
                    error = %create_err,
                    "File record creation failed after task submission, assembly task orphaned"
                );
                return Err(create_err);
            }
        };

        tracing::info!(
            upload_id = %req.upload_id,
            file_id = %record.id,
            task_id = %task_id,
            bucket = %bucket,
            total_chunks = req.total_chunks,
            declared_size = req.total_size,
            "Assembly dispatched"
        );

        Ok(record)
    }

    /// Resolve a record, enforcing the credential gate, and report its
    /// assembly task state. Read-only; safe to poll concurrently.
    pub async fn status(
        &self,
        file_id: Uuid,
        credential: Option<&MetaMap>,
    ) -> Result<(FileRecord, TaskState), AppError> {
        let record = self.get_file(file_id, credential).await?;
        let state = self.queue.state(record.task_id).await;
        Ok((record, state))
    }

    /// Re-run a failed assembly under its original task id.
    ///
    /// SUCCESS and in-flight states are guarded; FAILURE and UNKNOWN replay
    /// the original submission arguments verbatim. Two concurrent retries may
    /// both observe a stale terminal state and both resubmit; assembly is
    /// idempotent so the duplicate execution is harmless.
    pub async fn retry(
        &self,
        file_id: Uuid,
        credential: Option<&MetaMap>,
    ) -> Result<FileRecord, AppError> {
        let record = self.get_file(file_id, credential).await?;

        match self.queue.state(record.task_id).await {
            TaskState::Success => Err(AppError::AlreadyUploaded(file_id.to_string())),
            TaskState::Pending | TaskState::Started => {
                Err(AppError::UploadInProgress(file_id.to_string()))
            }
            TaskState::Failure | TaskState::Unknown => {
                let args = self
                    .queue
                    .original_args(record.task_id)
                    .await
                    .ok_or_else(|| {
                        AppError::TaskBackend(format!(
                            "Original arguments for task {} are no longer available",
                            record.task_id
                        ))
                    })?;
                self.queue.resubmit(record.task_id, args).await;

                tracing::info!(
                    file_id = %file_id,
                    task_id = %record.task_id,
                    "Assembly retry dispatched under original task id"
                );
                Ok(record)
            }
        }
    }

    /// Fetch a record, enforcing the credential gate for private files.
    pub async fn get_file(
        &self,
        file_id: Uuid,
        credential: Option<&MetaMap>,
    ) -> Result<FileRecord, AppError> {
        let record = self
            .repository
            .get(file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File not found: {}", file_id)))?;

        check_access(&record, credential)?;
        Ok(record)
    }

    /// Produce the download reference for a record: a direct URL for public
    /// files, a time-boxed signed URL carrying the credential for gated ones.
    pub async fn download_url(&self, record: &FileRecord) -> Result<String, AppError> {
        if !record.is_gated() {
            return Ok(self.storage.public_url(record.bucket(), record.object_key()));
        }

        let credential = record.credential.as_ref().map(credential_query_params);
        let extra_query = credential.unwrap_or_default();
        let url = self
            .storage
            .presigned_get_url(
                record.bucket(),
                record.object_key(),
                Duration::from_secs(self.config.presigned_url_expiry_secs),
                &extra_query,
            )
            .await?;
        Ok(url)
    }

    /// Delete a file: best-effort object removal, then the record. Returns
    /// the deleted record, or `None` if the id never existed.
    pub async fn delete_file(&self, file_id: Uuid) -> Result<Option<FileRecord>, AppError> {
        let Some(record) = self.repository.get(file_id).await? else {
            return Ok(None);
        };

        if let Err(e) = self
            .storage
            .delete(record.bucket(), record.object_key())
            .await
        {
            tracing::warn!(
                file_id = %file_id,
                path = %record.path,
                error = %e,
                "Object deletion failed, removing record anyway"
            );
        }

        let deleted = self.repository.delete(file_id).await?;
        if deleted.is_some() {
            tracing::info!(file_id = %file_id, "File deleted");
        }
        Ok(deleted)
    }

    pub async fn list_files(&self) -> Result<Vec<FileRecord>, AppError> {
        self.repository.list().await
    }

    pub async fn files_by_appointment(
        &self,
        appointment_id: &str,
    ) -> Result<Vec<FileRecord>, AppError> {
        self.repository.list_by_appointment(appointment_id).await
    }
}

/// Gated records require exact key-by-key credential equality; public
/// records are always readable.
fn check_access(record: &FileRecord, credential: Option<&MetaMap>) -> Result<(), AppError> {
    if !record.is_gated() {
        return Ok(());
    }
    match credential {
        Some(supplied) if Some(supplied) == record.credential.as_ref() => Ok(()),
        _ => Err(AppError::PermissionDenied(format!(
            "Credential mismatch for file {}",
            record.id
        ))),
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn gated_record(credential: MetaMap) -> FileRecord {
        FileRecord {
            id: Uuid::new_v4(),
            upload_id: Uuid::new_v4(),
            filename: "scan.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size: 10,
            path: "private/x.pdf".to_string(),
            credential: Some(credential),
            detail: None,
            task_id: Uuid::new_v4(),
            appointment_id: "appt".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_check_access_public_record() {
        let mut record = gated_record(MetaMap::new());
        record.credential = None;
        assert!(check_access(&record, None).is_ok());

        // Credential on a public record is ignored
        let mut extra = MetaMap::new();
        extra.insert("pin".to_string(), json!("1"));
        assert!(check_access(&record, Some(&extra)).is_ok());
    }

    #[test]
    fn test_check_access_requires_exact_match() {
        let mut cred = MetaMap::new();
        cred.insert("pin".to_string(), json!("1234"));
        cred.insert("who".to_string(), json!("alice"));
        let record = gated_record(cred.clone());

        assert!(check_access(&record, Some(&cred)).is_ok());

        assert!(matches!(
            check_access(&record, None),
            Err(AppError::PermissionDenied(_))
        ));

        let mut wrong = cred.clone();
        wrong.insert("pin".to_string(), json!("9999"));
        assert!(matches!(
            check_access(&record, Some(&wrong)),
            Err(AppError::PermissionDenied(_))
        ));

        // Subset of the keys is not enough
        let mut partial = MetaMap::new();
        partial.insert("pin".to_string(), json!("1234"));
        assert!(matches!(
            check_access(&record, Some(&partial)),
            Err(AppError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension(".PDF"), "pdf");
        assert_eq!(normalize_extension("txt"), "txt");
    }
}
