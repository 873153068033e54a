//! Task handler context trait
//!
//! The API implements this trait for its assembly worker. The queue calls
//! `dispatch_task` when processing a claimed task.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Context for task dispatch.
///
/// The worker pool holds a reference and calls `dispatch_task` for each
/// claimed task. A returned error marks the task FAILURE; its message is
/// retained for inspection.
#[async_trait]
pub trait TaskHandlerContext: Send + Sync {
    /// Execute the task and return its result payload.
    async fn dispatch_task(
        self: Arc<Self>,
        task_id: Uuid,
        payload: &serde_json::Value,
    ) -> anyhow::Result<serde_json::Value>;
}
