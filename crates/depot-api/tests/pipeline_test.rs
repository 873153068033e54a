//! End-to-end pipeline tests: init, chunk staging, completion, assembly,
//! and deletion against the in-memory repository and local store.

mod helpers;

use depot_core::models::TaskState;
use depot_core::AppError;
use depot_storage::Storage;
use helpers::{complete_req, harness, wait_for_state, MAX_CHUNK_SIZE};

#[tokio::test]
async fn test_end_to_end_upload_roundtrip() {
    let h = harness().await;

    let upload_id = h.service.initialize().await.unwrap();

    // Deliberately out of order; assembly must still be index order.
    h.service.write_chunk(upload_id, 2, b"cc").await.unwrap();
    h.service.write_chunk(upload_id, 0, b"aa").await.unwrap();
    h.service.write_chunk(upload_id, 1, b"bb").await.unwrap();

    let record = h.service.complete(complete_req(upload_id, 3, 6)).await.unwrap();
    assert_eq!(record.upload_id, upload_id);
    assert_eq!(record.path, format!("public/{}.bin", upload_id));

    wait_for_state(&h.queue, record.task_id, TaskState::Success).await;

    let (_, status) = h.service.status(record.id, None).await.unwrap();
    assert_eq!(status, TaskState::Success);

    // Download URL is direct for a public file, and the stored bytes match
    // the chunks concatenated in index order.
    let url = h.service.download_url(&record).await.unwrap();
    assert_eq!(
        url,
        format!("http://localhost:4000/objects/public/{}.bin", upload_id)
    );
    let stored = h
        .storage
        .get(record.bucket(), record.object_key())
        .await
        .unwrap();
    assert_eq!(stored, b"aabbcc");
}

#[tokio::test]
async fn test_complete_is_idempotent() {
    let h = harness().await;

    let upload_id = h.service.initialize().await.unwrap();
    h.service.write_chunk(upload_id, 0, b"data").await.unwrap();

    let first = h.service.complete(complete_req(upload_id, 1, 4)).await.unwrap();
    wait_for_state(&h.queue, first.task_id, TaskState::Success).await;

    // Replay after the staging directory is already consumed: still the
    // same record, no second task.
    let second = h.service.complete(complete_req(upload_id, 1, 4)).await.unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.task_id, first.task_id);
}

#[tokio::test]
async fn test_oversized_chunk_writes_nothing() {
    let h = harness().await;

    let upload_id = h.service.initialize().await.unwrap();
    let oversized = vec![0u8; MAX_CHUNK_SIZE + 1];

    let err = h.service.write_chunk(upload_id, 0, &oversized).await.unwrap_err();
    assert!(matches!(err, AppError::ChunkTooLarge { .. }));

    // Nothing reached the staging directory.
    let session_dir = h.staging.path().join(upload_id.to_string());
    let mut entries = tokio::fs::read_dir(&session_dir).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());

    // A chunk exactly at the limit is fine.
    let exact = vec![0u8; MAX_CHUNK_SIZE];
    h.service.write_chunk(upload_id, 0, &exact).await.unwrap();
}

#[tokio::test]
async fn test_chunk_write_requires_session() {
    let h = harness().await;

    let err = h
        .service
        .write_chunk(uuid::Uuid::new_v4(), 0, b"data")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SessionNotFound(_)));
}

#[tokio::test]
async fn test_complete_unknown_session() {
    let h = harness().await;

    let err = h
        .service
        .complete(complete_req(uuid::Uuid::new_v4(), 1, 4))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SessionNotFound(_)));
}

#[tokio::test]
async fn test_complete_rejects_disallowed_extension() {
    let h = harness().await;

    let upload_id = h.service.initialize().await.unwrap();
    h.service.write_chunk(upload_id, 0, b"MZ").await.unwrap();

    let mut req = complete_req(upload_id, 1, 2);
    req.file_extension = "exe".to_string();
    let err = h.service.complete(req).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn test_delete_nonexistent_returns_none() {
    let h = harness().await;

    let deleted = h.service.delete_file(uuid::Uuid::new_v4()).await.unwrap();
    assert!(deleted.is_none());
}

#[tokio::test]
async fn test_delete_removes_object_and_record() {
    let h = harness().await;

    let upload_id = h.service.initialize().await.unwrap();
    h.service.write_chunk(upload_id, 0, b"bytes").await.unwrap();
    let record = h.service.complete(complete_req(upload_id, 1, 5)).await.unwrap();
    wait_for_state(&h.queue, record.task_id, TaskState::Success).await;

    let deleted = h.service.delete_file(record.id).await.unwrap().unwrap();
    assert_eq!(deleted.id, record.id);

    assert!(!h
        .storage
        .exists(record.bucket(), record.object_key())
        .await
        .unwrap());
    let err = h.service.get_file(record.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // Second delete of the same id is an absent result, not an error.
    assert!(h.service.delete_file(record.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_files_by_appointment() {
    let h = harness().await;

    for appointment in ["appt-a", "appt-a", "appt-b"] {
        let upload_id = h.service.initialize().await.unwrap();
        h.service.write_chunk(upload_id, 0, b"x").await.unwrap();
        let mut req = complete_req(upload_id, 1, 1);
        req.appointment_id = appointment.to_string();
        h.service.complete(req).await.unwrap();
    }

    assert_eq!(h.service.list_files().await.unwrap().len(), 3);
    assert_eq!(h.service.files_by_appointment("appt-a").await.unwrap().len(), 2);
    assert_eq!(h.service.files_by_appointment("missing").await.unwrap().len(), 0);
}
