//! In-memory file repository.
//!
//! Backs tests and database-less deployments. Honors the same contract as
//! the Postgres implementation, including `upload_id` uniqueness.

use async_trait::async_trait;
use chrono::Utc;
use depot_core::models::{FileRecord, NewFileRecord};
use depot_core::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::files::FileRepository;

#[derive(Clone, Default)]
pub struct InMemoryFileRepository {
    records: Arc<RwLock<HashMap<Uuid, FileRecord>>>,
}

impl InMemoryFileRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileRepository for InMemoryFileRepository {
    async fn create(&self, new: NewFileRecord) -> Result<FileRecord, AppError> {
        let mut records = self.records.write().await;

        if records.values().any(|r| r.upload_id == new.upload_id) {
            return Err(AppError::Internal(format!(
                "unique constraint violation: file record for upload {} already exists",
                new.upload_id
            )));
        }

        let record = FileRecord {
            id: Uuid::new_v4(),
            upload_id: new.upload_id,
            filename: new.filename,
            content_type: new.content_type,
            size: new.size,
            path: new.path,
            credential: new.credential,
            detail: new.detail,
            task_id: new.task_id,
            appointment_id: new.appointment_id,
            created_at: Utc::now(),
        };
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn find_by_upload_id(&self, upload_id: Uuid) -> Result<Option<FileRecord>, AppError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|r| r.upload_id == upload_id)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        Ok(self.records.write().await.remove(&id))
    }

    async fn list(&self) -> Result<Vec<FileRecord>, AppError> {
        let mut all: Vec<FileRecord> = self.records.read().await.values().cloned().collect();
        all.sort_by_key(|r| r.created_at);
        Ok(all)
    }

    async fn list_by_appointment(
        &self,
        appointment_id: &str,
    ) -> Result<Vec<FileRecord>, AppError> {
        let mut matching: Vec<FileRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.appointment_id == appointment_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.created_at);
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(upload_id: Uuid, appointment_id: &str) -> NewFileRecord {
        NewFileRecord {
            upload_id,
            filename: "scan.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size: 10,
            path: format!("public/{}.pdf", upload_id),
            credential: None,
            detail: None,
            task_id: Uuid::new_v4(),
            appointment_id: appointment_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemoryFileRepository::new();
        let upload_id = Uuid::new_v4();

        let created = repo.create(new_record(upload_id, "a1")).await.unwrap();
        let fetched = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);

        let by_upload = repo.find_by_upload_id(upload_id).await.unwrap().unwrap();
        assert_eq!(by_upload.id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_upload_id_rejected() {
        let repo = InMemoryFileRepository::new();
        let upload_id = Uuid::new_v4();

        repo.create(new_record(upload_id, "a1")).await.unwrap();
        assert!(repo.create(new_record(upload_id, "a1")).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_returns_record_then_none() {
        let repo = InMemoryFileRepository::new();
        let created = repo.create(new_record(Uuid::new_v4(), "a1")).await.unwrap();

        let deleted = repo.delete(created.id).await.unwrap();
        assert_eq!(deleted, Some(created.clone()));

        assert_eq!(repo.delete(created.id).await.unwrap(), None);
        assert_eq!(repo.get(created.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_by_appointment() {
        let repo = InMemoryFileRepository::new();
        repo.create(new_record(Uuid::new_v4(), "a1")).await.unwrap();
        repo.create(new_record(Uuid::new_v4(), "a2")).await.unwrap();
        repo.create(new_record(Uuid::new_v4(), "a1")).await.unwrap();

        assert_eq!(repo.list_by_appointment("a1").await.unwrap().len(), 2);
        assert_eq!(repo.list_by_appointment("a3").await.unwrap().len(), 0);
        assert_eq!(repo.list().await.unwrap().len(), 3);
    }
}
