//! Assembly worker context.
//!
//! Executes assembly tasks submitted by [`UploadService::complete`]: reads
//! the staged chunks in index order, writes the final object, then removes
//! the staging directory. SUCCESS is only reported after every chunk was
//! read and the object durably written; any earlier failure leaves staging
//! intact so a retry can re-run the same task.
//!
//! [`UploadService::complete`]: crate::services::upload::UploadService::complete

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use depot_core::models::AssembleArgs;
use depot_storage::{ChunkStore, Storage};
use depot_worker::TaskHandlerContext;

pub struct AssemblyContext {
    storage: Arc<dyn Storage>,
    chunks: ChunkStore,
}

impl AssemblyContext {
    pub fn new(storage: Arc<dyn Storage>, chunks: ChunkStore) -> Self {
        Self { storage, chunks }
    }
}

#[async_trait]
impl TaskHandlerContext for AssemblyContext {
    async fn dispatch_task(
        self: Arc<Self>,
        task_id: Uuid,
        payload: &serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        let args = AssembleArgs::from_payload(payload)?;
        let start = std::time::Instant::now();

        let data = self
            .chunks
            .read_assembled(args.upload_id, args.total_chunks)
            .await?;
        let size_bytes = data.len();

        let url = self
            .storage
            .put(&args.bucket, &args.object_key, &args.content_type, data)
            .await?;

        // Object is durable from here; staging cleanup is best-effort.
        if let Err(e) = self.chunks.remove_session(args.upload_id).await {
            tracing::warn!(
                task_id = %task_id,
                upload_id = %args.upload_id,
                error = %e,
                "Staging cleanup failed after successful assembly"
            );
        }

        tracing::info!(
            task_id = %task_id,
            upload_id = %args.upload_id,
            bucket = %args.bucket,
            key = %args.object_key,
            total_chunks = args.total_chunks,
            size_bytes = size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Assembly completed"
        );

        Ok(serde_json::json!({ "url": url, "size_bytes": size_bytes }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_storage::{LocalStore, UrlSigner};
    use serde_json::json;
    use tempfile::tempdir;

    async fn context(staging: &std::path::Path, objects: &std::path::Path) -> Arc<AssemblyContext> {
        let storage = LocalStore::new(
            objects,
            "http://localhost:4000/objects".to_string(),
            UrlSigner::new("test-secret"),
        )
        .await
        .unwrap();
        Arc::new(AssemblyContext::new(
            Arc::new(storage),
            ChunkStore::new(staging),
        ))
    }

    #[tokio::test]
    async fn test_assembles_chunks_in_index_order() {
        let staging = tempdir().unwrap();
        let objects = tempdir().unwrap();
        let ctx = context(staging.path(), objects.path()).await;

        let upload_id = Uuid::new_v4();
        let chunks = ChunkStore::new(staging.path());
        chunks.create_session(upload_id).await.unwrap();
        chunks.write_chunk(upload_id, 1, b"bb").await.unwrap();
        chunks.write_chunk(upload_id, 0, b"aa").await.unwrap();

        let args = AssembleArgs {
            bucket: "public".to_string(),
            upload_id,
            total_chunks: 2,
            object_key: format!("{}.bin", upload_id),
            content_type: "application/octet-stream".to_string(),
        };
        let result = ctx
            .clone()
            .dispatch_task(Uuid::new_v4(), &args.to_payload().unwrap())
            .await
            .unwrap();

        assert_eq!(result["size_bytes"], json!(4));
        // Staging is consumed after success
        assert!(!chunks.session_exists(upload_id).await);

        let stored = tokio::fs::read(objects.path().join("public").join(&args.object_key))
            .await
            .unwrap();
        assert_eq!(stored, b"aabb");
    }

    #[tokio::test]
    async fn test_missing_chunk_fails_and_keeps_staging() {
        let staging = tempdir().unwrap();
        let objects = tempdir().unwrap();
        let ctx = context(staging.path(), objects.path()).await;

        let upload_id = Uuid::new_v4();
        let chunks = ChunkStore::new(staging.path());
        chunks.create_session(upload_id).await.unwrap();
        chunks.write_chunk(upload_id, 0, b"aa").await.unwrap();

        let args = AssembleArgs {
            bucket: "public".to_string(),
            upload_id,
            total_chunks: 2,
            object_key: format!("{}.bin", upload_id),
            content_type: "application/octet-stream".to_string(),
        };
        let result = ctx
            .dispatch_task(Uuid::new_v4(), &args.to_payload().unwrap())
            .await;

        assert!(result.is_err());
        assert!(chunks.session_exists(upload_id).await);
    }
}
