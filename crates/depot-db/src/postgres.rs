//! Postgres file repository.
//!
//! Uses dynamic SQLx queries to avoid requiring DATABASE_URL/sqlx prepare at
//! build time. The `files.upload_id` unique constraint (see migrations) backs
//! the one-record-per-session invariant.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use depot_core::models::{FileRecord, MetaMap, NewFileRecord};
use depot_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::files::FileRepository;

#[derive(Clone)]
pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded migrations for this repository's tables.
    pub async fn migrate(pool: &PgPool) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct FileRow {
    id: Uuid,
    upload_id: Uuid,
    filename: String,
    content_type: String,
    size: i64,
    path: String,
    credential: Option<serde_json::Value>,
    detail: Option<serde_json::Value>,
    task_id: Uuid,
    appointment_id: String,
    created_at: DateTime<Utc>,
}

fn map_from_json(value: Option<serde_json::Value>) -> Result<Option<MetaMap>, AppError> {
    value
        .map(|v| {
            serde_json::from_value::<MetaMap>(v)
                .map_err(|e| AppError::Internal(format!("Malformed stored metadata map: {}", e)))
        })
        .transpose()
}

impl TryFrom<FileRow> for FileRecord {
    type Error = AppError;

    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        Ok(FileRecord {
            id: row.id,
            upload_id: row.upload_id,
            filename: row.filename,
            content_type: row.content_type,
            size: row.size,
            path: row.path,
            credential: map_from_json(row.credential)?,
            detail: map_from_json(row.detail)?,
            task_id: row.task_id,
            appointment_id: row.appointment_id,
            created_at: row.created_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, upload_id, filename, content_type, size, path, \
     credential, detail, task_id, appointment_id, created_at";

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn create(&self, new: NewFileRecord) -> Result<FileRecord, AppError> {
        let credential = new
            .credential
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        let detail = new.detail.as_ref().map(serde_json::to_value).transpose()?;

        let row = sqlx::query_as::<_, FileRow>(&format!(
            r#"
            INSERT INTO files (
                id, upload_id, filename, content_type, size, path,
                credential, detail, task_id, appointment_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(new.upload_id)
        .bind(new.filename)
        .bind(new.content_type)
        .bind(new.size)
        .bind(new.path)
        .bind(credential)
        .bind(detail)
        .bind(new.task_id)
        .bind(new.appointment_id)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        let row = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {} FROM files WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FileRecord::try_from).transpose()
    }

    async fn find_by_upload_id(&self, upload_id: Uuid) -> Result<Option<FileRecord>, AppError> {
        let row = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {} FROM files WHERE upload_id = $1",
            SELECT_COLUMNS
        ))
        .bind(upload_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FileRecord::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        let row = sqlx::query_as::<_, FileRow>(&format!(
            "DELETE FROM files WHERE id = $1 RETURNING {}",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FileRecord::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<FileRecord>, AppError> {
        let rows = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {} FROM files ORDER BY created_at",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FileRecord::try_from).collect()
    }

    async fn list_by_appointment(
        &self,
        appointment_id: &str,
    ) -> Result<Vec<FileRecord>, AppError> {
        let rows = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {} FROM files WHERE appointment_id = $1 ORDER BY created_at",
            SELECT_COLUMNS
        ))
        .bind(appointment_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FileRecord::try_from).collect()
    }
}
