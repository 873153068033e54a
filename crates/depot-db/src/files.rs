use async_trait::async_trait;
use depot_core::models::{FileRecord, NewFileRecord};
use depot_core::AppError;
use uuid::Uuid;

/// Capability trait over the relational record store.
///
/// One durable row per completed (or in-flight) upload. Implementations must
/// reject a second `create` for the same `upload_id`; callers rely on that
/// constraint, not application-level locking, for idempotency under races.
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Insert a new record, assigning `id` and `created_at`.
    /// Fails if a record with the same `upload_id` already exists.
    async fn create(&self, new: NewFileRecord) -> Result<FileRecord, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<FileRecord>, AppError>;

    async fn find_by_upload_id(&self, upload_id: Uuid) -> Result<Option<FileRecord>, AppError>;

    /// Delete a record, returning it if it existed.
    async fn delete(&self, id: Uuid) -> Result<Option<FileRecord>, AppError>;

    async fn list(&self) -> Result<Vec<FileRecord>, AppError>;

    async fn list_by_appointment(&self, appointment_id: &str)
        -> Result<Vec<FileRecord>, AppError>;
}
