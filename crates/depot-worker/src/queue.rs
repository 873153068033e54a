//! Task queue: in-memory task table, worker pool, and same-id resubmission.
//!
//! Shutdown: [`TaskQueue::shutdown`] signals the pool to stop; it does not
//! wait for in-flight tasks. For graceful shutdown, coordinate with your
//! runtime and allow time for running tasks to finish before process exit.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock, Semaphore};
use tokio::time::sleep;
use uuid::Uuid;

use depot_core::models::TaskState;

use crate::context::TaskHandlerContext;

#[derive(Clone)]
pub struct TaskQueueConfig {
    pub max_workers: usize,
    pub poll_interval_ms: u64,
    pub task_timeout_secs: u64,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            poll_interval_ms: 200,
            task_timeout_secs: 3600,
        }
    }
}

/// One row of the task table. Kept after completion so state queries and
/// same-id retries keep working; `payload` is the original submission
/// arguments, replayed verbatim on retry.
#[derive(Debug, Clone)]
struct TaskEntry {
    payload: serde_json::Value,
    state: TaskState,
    submitted_at: DateTime<Utc>,
    error: Option<String>,
}

type TaskTable = Arc<RwLock<HashMap<Uuid, TaskEntry>>>;

pub struct TaskQueue {
    table: TaskTable,
    pending: Arc<Mutex<VecDeque<Uuid>>>,
    wake_tx: mpsc::Sender<()>,
    shutdown_tx: mpsc::Sender<()>,
}

impl TaskQueue {
    /// Create a new TaskQueue and start its worker pool.
    ///
    /// The pool claims pending tasks up to `max_workers` at a time, waking on
    /// submission and additionally polling at `poll_interval_ms`.
    pub fn new(config: TaskQueueConfig, context: Arc<dyn TaskHandlerContext>) -> Self {
        let table: TaskTable = Arc::new(RwLock::new(HashMap::new()));
        let pending = Arc::new(Mutex::new(VecDeque::new()));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (wake_tx, wake_rx) = mpsc::channel(16);

        let table_clone = table.clone();
        let pending_clone = pending.clone();

        tokio::spawn(async move {
            Self::worker_pool(
                table_clone,
                pending_clone,
                config,
                context,
                shutdown_rx,
                wake_rx,
            )
            .await;
        });

        Self {
            table,
            pending,
            wake_tx,
            shutdown_tx,
        }
    }

    /// Submit a new task. Returns the backend-assigned task id synchronously;
    /// execution happens on the worker pool.
    pub async fn submit(&self, payload: serde_json::Value) -> Uuid {
        let task_id = Uuid::new_v4();
        self.enqueue(task_id, payload).await;
        tracing::info!(task_id = %task_id, "Task submitted to queue");
        task_id
    }

    /// Re-submit a task under its existing id, replacing any previous entry.
    ///
    /// Task identity is never reissued on retry: status polling against the
    /// same id keeps working across executions. Callers are responsible for
    /// not resubmitting while the task is PENDING or STARTED.
    pub async fn resubmit(&self, task_id: Uuid, payload: serde_json::Value) {
        self.enqueue(task_id, payload).await;
        tracing::info!(task_id = %task_id, "Task resubmitted to queue");
    }

    async fn enqueue(&self, task_id: Uuid, payload: serde_json::Value) {
        {
            let mut table = self.table.write().await;
            table.insert(
                task_id,
                TaskEntry {
                    payload,
                    state: TaskState::Pending,
                    submitted_at: Utc::now(),
                    error: None,
                },
            );
        }
        self.pending.lock().await.push_back(task_id);
        // Full wake channel means the pool is already awake
        let _ = self.wake_tx.try_send(());
    }

    /// Current lifecycle state; UNKNOWN for ids the table has no record of.
    pub async fn state(&self, task_id: Uuid) -> TaskState {
        self.table
            .read()
            .await
            .get(&task_id)
            .map(|e| e.state)
            .unwrap_or(TaskState::Unknown)
    }

    /// Original submission arguments, for same-id retries.
    pub async fn original_args(&self, task_id: Uuid) -> Option<serde_json::Value> {
        self.table
            .read()
            .await
            .get(&task_id)
            .map(|e| e.payload.clone())
    }

    /// Failure message of the most recent execution, if any.
    pub async fn last_error(&self, task_id: Uuid) -> Option<String> {
        self.table
            .read()
            .await
            .get(&task_id)
            .and_then(|e| e.error.clone())
    }

    /// Signal the worker pool to stop. Does not wait for in-flight tasks.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }

    async fn worker_pool(
        table: TaskTable,
        pending: Arc<Mutex<VecDeque<Uuid>>>,
        config: TaskQueueConfig,
        context: Arc<dyn TaskHandlerContext>,
        mut shutdown_rx: mpsc::Receiver<()>,
        mut wake_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(
            max_workers = config.max_workers,
            poll_interval_ms = config.poll_interval_ms,
            "Task queue worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers));
        let poll_interval = Duration::from_millis(config.poll_interval_ms);
        let task_timeout = Duration::from_secs(config.task_timeout_secs);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Task queue worker pool shutting down");
                    break;
                }
                _ = wake_rx.recv() => {
                    Self::claim_and_dispatch(&table, &pending, &semaphore, &context, task_timeout).await;
                }
                _ = sleep(poll_interval) => {
                    Self::claim_and_dispatch(&table, &pending, &semaphore, &context, task_timeout).await;
                }
            }
        }

        tracing::info!("Task queue worker pool stopped");
    }

    /// Drain pending tasks into workers until permits or work run out.
    async fn claim_and_dispatch(
        table: &TaskTable,
        pending: &Arc<Mutex<VecDeque<Uuid>>>,
        semaphore: &Arc<Semaphore>,
        context: &Arc<dyn TaskHandlerContext>,
        task_timeout: Duration,
    ) {
        loop {
            let permit = match semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::debug!("No workers available, skipping claim");
                    return;
                }
            };

            let task_id = match pending.lock().await.pop_front() {
                Some(id) => id,
                None => return,
            };

            // Claim: only a PENDING entry moves to STARTED. A resubmitted-then-
            // replaced entry can leave a stale queue slot behind; skip those.
            let payload = {
                let mut t = table.write().await;
                match t.get_mut(&task_id) {
                    Some(entry) if entry.state == TaskState::Pending => {
                        entry.state = TaskState::Started;
                        let waited = Utc::now() - entry.submitted_at;
                        tracing::debug!(
                            task_id = %task_id,
                            queue_wait_ms = waited.num_milliseconds(),
                            "Task claimed"
                        );
                        entry.payload.clone()
                    }
                    _ => continue,
                }
            };

            let table = table.clone();
            let ctx = context.clone();

            tokio::spawn(async move {
                let _permit = permit;
                Self::process_task(task_id, payload, table, ctx, task_timeout).await;
            });
        }
    }

    async fn process_task(
        task_id: Uuid,
        payload: serde_json::Value,
        table: TaskTable,
        context: Arc<dyn TaskHandlerContext>,
        task_timeout: Duration,
    ) {
        let start = std::time::Instant::now();
        let result =
            tokio::time::timeout(task_timeout, context.dispatch_task(task_id, &payload)).await;

        let (state, error) = match result {
            Ok(Ok(_)) => {
                tracing::info!(
                    task_id = %task_id,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Task completed successfully"
                );
                (TaskState::Success, None)
            }
            Ok(Err(e)) => {
                tracing::error!(
                    task_id = %task_id,
                    error = %e,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Task failed"
                );
                (TaskState::Failure, Some(e.to_string()))
            }
            Err(_) => {
                tracing::error!(
                    task_id = %task_id,
                    timeout_secs = task_timeout.as_secs(),
                    "Task timed out"
                );
                (TaskState::Failure, Some("task timed out".to_string()))
            }
        };

        let mut t = table.write().await;
        if let Some(entry) = t.get_mut(&task_id) {
            // A concurrent resubmission may have already reset this entry to
            // PENDING; the fresh execution's outcome wins in that case.
            if entry.state == TaskState::Started {
                entry.state = state;
                entry.error = error;
            }
        }
    }
}
