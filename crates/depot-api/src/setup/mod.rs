//! Application setup: wires storage, the record store, the worker queue,
//! and the router from configuration.

pub mod routes;
pub mod server;

use anyhow::Result;
use axum::Router;
use std::sync::Arc;

use depot_core::{Config, StorageBackend};
use depot_db::{FileRepository, InMemoryFileRepository, PgFileRepository};
use depot_storage::{ChunkStore, LocalStore, Storage, UrlSigner};
use depot_worker::{TaskQueue, TaskQueueConfig};

use crate::services::assembly::AssemblyContext;
use crate::services::upload::UploadService;
use crate::state::AppState;

/// Build all services and the router. Returns the state alongside so the
/// caller can hold on to it (tests, shutdown hooks).
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router)> {
    let (storage, local) = setup_storage(&config).await?;
    let repository = setup_repository(&config).await?;

    let chunks = ChunkStore::new(config.upload_staging_dir.clone());

    let context = Arc::new(AssemblyContext::new(storage.clone(), chunks.clone()));
    let queue = Arc::new(TaskQueue::new(
        TaskQueueConfig {
            max_workers: config.task_queue_max_workers,
            poll_interval_ms: config.task_queue_poll_interval_ms,
            task_timeout_secs: config.task_queue_task_timeout_secs,
        },
        context,
    ));

    let upload_service = Arc::new(UploadService::new(
        config.clone(),
        repository,
        storage,
        chunks,
        queue,
    ));

    let state = Arc::new(AppState {
        config: config.clone(),
        upload_service,
        local,
    });

    let router = routes::setup_routes(&config, state.clone())?;
    Ok((state, router))
}

async fn setup_storage(
    config: &Config,
) -> Result<(Arc<dyn Storage>, Option<Arc<LocalStore>>)> {
    match config.storage_backend {
        StorageBackend::Local => {
            let store = Arc::new(
                LocalStore::new(
                    config.local_storage_path.clone(),
                    config.local_storage_base_url.clone(),
                    UrlSigner::new(config.url_signing_secret.clone()),
                )
                .await?,
            );
            tracing::info!(
                path = %config.local_storage_path,
                base_url = %config.local_storage_base_url,
                "Local storage backend initialized"
            );
            Ok((store.clone(), Some(store)))
        }
        StorageBackend::S3 => {
            #[cfg(feature = "storage-s3")]
            {
                let buckets = [config.public_bucket.clone(), config.private_bucket.clone()];
                let store = depot_storage::S3Store::new(
                    &buckets,
                    config
                        .s3_region
                        .clone()
                        .unwrap_or_else(|| "us-east-1".to_string()),
                    config.s3_endpoint.clone(),
                )
                .await?;
                tracing::info!(
                    region = ?config.s3_region,
                    endpoint = ?config.s3_endpoint,
                    "S3 storage backend initialized"
                );
                Ok((Arc::new(store) as Arc<dyn Storage>, None))
            }
            #[cfg(not(feature = "storage-s3"))]
            {
                anyhow::bail!(
                    "STORAGE_BACKEND=s3 requires building with the storage-s3 feature"
                )
            }
        }
    }
}

async fn setup_repository(config: &Config) -> Result<Arc<dyn FileRepository>> {
    match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await?;
            PgFileRepository::migrate(&pool).await?;
            tracing::info!("Postgres file repository initialized");
            Ok(Arc::new(PgFileRepository::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory file repository");
            Ok(Arc::new(InMemoryFileRepository::new()))
        }
    }
}
