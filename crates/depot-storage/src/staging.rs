//! Filesystem staging area for in-progress chunked uploads.
//!
//! Each upload session owns one directory under the staging root, named by
//! its session id; chunk `i` is the file `{i}.part` inside it. The directory
//! is created at session initialization and removed by the assembly worker
//! after the final object is durably written.

use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

#[derive(Clone)]
pub struct ChunkStore {
    root: PathBuf,
}

impl ChunkStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn session_dir(&self, session_id: Uuid) -> PathBuf {
        self.root.join(session_id.to_string())
    }

    fn chunk_path(&self, session_id: Uuid, index: u32) -> PathBuf {
        self.session_dir(session_id).join(format!("{}.part", index))
    }

    /// Create the staging directory for a new session. Durable across
    /// restarts; idempotent.
    pub async fn create_session(&self, session_id: Uuid) -> StorageResult<()> {
        let dir = self.session_dir(session_id);
        fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::BackendError(format!(
                "Failed to create staging directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        tracing::info!(session_id = %session_id, "Upload session staging directory created");
        Ok(())
    }

    pub async fn session_exists(&self, session_id: Uuid) -> bool {
        fs::try_exists(self.session_dir(session_id))
            .await
            .unwrap_or(false)
    }

    /// Write (or overwrite) the chunk at `index`. Last write for an index
    /// wins; chunks of the same session may arrive in any order.
    pub async fn write_chunk(
        &self,
        session_id: Uuid,
        index: u32,
        data: &[u8],
    ) -> StorageResult<()> {
        if !self.session_exists(session_id).await {
            return Err(StorageError::NotFound(session_id.to_string()));
        }

        let path = self.chunk_path(session_id, index);
        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create chunk {}: {}", path.display(), e))
        })?;
        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write chunk {}: {}", path.display(), e))
        })?;
        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync chunk {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            session_id = %session_id,
            chunk_index = index,
            size_bytes = data.len(),
            "Chunk written to staging"
        );
        Ok(())
    }

    /// Read chunks `0..total_chunks` and concatenate them in index order.
    /// A missing chunk fails the whole read; nothing is cleaned up here.
    pub async fn read_assembled(
        &self,
        session_id: Uuid,
        total_chunks: u32,
    ) -> StorageResult<Vec<u8>> {
        let mut combined = Vec::new();
        for index in 0..total_chunks {
            let path = self.chunk_path(session_id, index);
            let bytes = fs::read(&path).await.map_err(|e| {
                StorageError::DownloadFailed(format!(
                    "Failed to read chunk {} of session {}: {}",
                    index, session_id, e
                ))
            })?;
            combined.extend_from_slice(&bytes);
        }
        Ok(combined)
    }

    /// Remove the session directory and everything in it. Removing a
    /// nonexistent session is not an error.
    pub async fn remove_session(&self, session_id: Uuid) -> StorageResult<()> {
        let dir = self.session_dir(session_id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::info!(session_id = %session_id, "Upload session staging directory removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to remove staging directory {}: {}",
                dir.display(),
                e
            ))),
        }
    }
}
