//! Shared test harness: a full upload pipeline against the in-memory
//! repository, a tempdir-backed local store, and a real worker queue.
//!
//! Run from workspace root: `cargo test -p depot-api`.

// Each integration test binary compiles its own copy; not every binary uses
// every helper.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use depot_api::services::assembly::AssemblyContext;
use depot_api::services::upload::{CompleteUpload, UploadService};
use depot_core::models::{MetaMap, TaskState};
use depot_core::{Config, StorageBackend};
use depot_db::InMemoryFileRepository;
use depot_storage::{ChunkStore, LocalStore, Storage, UrlSigner};
use depot_worker::{TaskHandlerContext, TaskQueue, TaskQueueConfig};
use tempfile::TempDir;
use uuid::Uuid;

pub const SIGNING_SECRET: &str = "test-secret";
pub const MAX_CHUNK_SIZE: usize = 1024;

pub struct Harness {
    pub service: UploadService,
    pub storage: Arc<LocalStore>,
    pub queue: Arc<TaskQueue>,
    pub staging: TempDir,
    _objects: TempDir,
}

fn test_config(staging: &TempDir, objects: &TempDir) -> Config {
    Config {
        server_port: 0,
        cors_origins: vec!["*".to_string()],
        max_chunk_size_bytes: MAX_CHUNK_SIZE,
        upload_staging_dir: staging.path().to_string_lossy().into_owned(),
        allowed_file_extensions: vec!["bin".to_string(), "pdf".to_string(), "txt".to_string()],
        storage_backend: StorageBackend::Local,
        public_bucket: "public".to_string(),
        private_bucket: "private".to_string(),
        presigned_url_expiry_secs: 60,
        local_storage_path: objects.path().to_string_lossy().into_owned(),
        local_storage_base_url: "http://localhost:4000/objects".to_string(),
        url_signing_secret: SIGNING_SECRET.to_string(),
        s3_region: None,
        s3_endpoint: None,
        database_url: None,
        task_queue_max_workers: 2,
        task_queue_poll_interval_ms: 10,
        task_queue_task_timeout_secs: 30,
    }
}

/// Harness with the real assembly worker.
pub async fn harness() -> Harness {
    build(None).await
}

/// Harness whose queue dispatches to `context` instead of the assembly
/// worker, for driving task states directly.
pub async fn harness_with_context(context: Arc<dyn TaskHandlerContext>) -> Harness {
    build(Some(context)).await
}

async fn build(context: Option<Arc<dyn TaskHandlerContext>>) -> Harness {
    let staging = tempfile::tempdir().expect("staging tempdir");
    let objects = tempfile::tempdir().expect("objects tempdir");
    let config = test_config(&staging, &objects);

    let storage = Arc::new(
        LocalStore::new(
            objects.path(),
            config.local_storage_base_url.clone(),
            UrlSigner::new(SIGNING_SECRET),
        )
        .await
        .expect("local store"),
    );
    let chunks = ChunkStore::new(staging.path());

    let context = context.unwrap_or_else(|| {
        Arc::new(AssemblyContext::new(
            storage.clone() as Arc<dyn Storage>,
            chunks.clone(),
        ))
    });
    let queue = Arc::new(TaskQueue::new(
        TaskQueueConfig {
            max_workers: config.task_queue_max_workers,
            poll_interval_ms: config.task_queue_poll_interval_ms,
            task_timeout_secs: config.task_queue_task_timeout_secs,
        },
        context,
    ));

    let service = UploadService::new(
        config,
        Arc::new(InMemoryFileRepository::new()),
        storage.clone(),
        chunks,
        queue.clone(),
    );

    Harness {
        service,
        storage,
        queue,
        staging,
        _objects: objects,
    }
}

/// Default completion request for a public upload.
pub fn complete_req(upload_id: Uuid, total_chunks: u32, total_size: i64) -> CompleteUpload {
    CompleteUpload {
        upload_id,
        total_chunks,
        total_size,
        file_extension: "bin".to_string(),
        content_type: "application/octet-stream".to_string(),
        filename: "payload.bin".to_string(),
        size: total_size,
        credential: None,
        detail: None,
        appointment_id: "appt-1".to_string(),
    }
}

/// Poll the queue until the task reaches `wanted`.
pub async fn wait_for_state(queue: &TaskQueue, task_id: Uuid, wanted: TaskState) {
    for _ in 0..500 {
        if queue.state(task_id).await == wanted {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "task {} never reached {:?}, last state {:?}",
        task_id,
        wanted,
        queue.state(task_id).await
    );
}

/// Build a credential map from string pairs.
pub fn credential(pairs: &[(&str, &str)]) -> MetaMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect()
}
