use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::models::{ScheduledTask, TaskHandle, TaskPayload, TaskQueueError};
use crate::scheduler::{TaskHandler, TaskScheduler, SCHEDULE_GRACE_SECONDS};

struct PendingEntry {
    join: JoinHandle<()>,
    started: Arc<AtomicBool>,
}

struct Inner {
    handler: RwLock<Option<Arc<dyn TaskHandler>>>,
    tasks: Mutex<HashMap<Uuid, PendingEntry>>,
}

/// In-process task scheduler backed by `tokio::time::sleep`.
///
/// Used when no Redis URL is configured, and by tests. Tasks survive only as
/// long as the process; the handle map is what makes cancel-with-terminate
/// work: a pending task is aborted while it sleeps, a running one is aborted
/// mid-handler.
#[derive(Clone)]
pub struct InMemoryTaskScheduler {
    inner: Arc<Inner>,
}

impl InMemoryTaskScheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                handler: RwLock::new(None),
                tasks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register the handler fired tasks dispatch to. Registered after
    /// construction so the handler itself may hold the scheduler.
    pub async fn set_handler(&self, handler: Arc<dyn TaskHandler>) {
        *self.inner.handler.write().await = Some(handler);
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.tasks.lock().await.len()
    }
}

impl Default for InMemoryTaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TaskScheduler for InMemoryTaskScheduler {
    async fn schedule(
        &self,
        payload: TaskPayload,
        fire_at: DateTime<Utc>,
    ) -> Result<TaskHandle, TaskQueueError> {
        if fire_at < Utc::now() - Duration::seconds(SCHEDULE_GRACE_SECONDS) {
            return Err(TaskQueueError::FireTimeInPast {
                fire_at,
                grace_seconds: SCHEDULE_GRACE_SECONDS,
            });
        }

        let task = ScheduledTask::new(payload, fire_at);
        let handle = task.handle();
        let task_id = task.task_id;
        let delay = (fire_at - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        let started = Arc::new(AtomicBool::new(false));
        let started_flag = Arc::clone(&started);
        let inner = Arc::clone(&self.inner);

        // Holding the map lock across spawn + insert keeps the spawned task
        // from removing its entry before it exists.
        let mut tasks = self.inner.tasks.lock().await;
        let join = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            started_flag.store(true, Ordering::SeqCst);

            let handler = inner.handler.read().await.clone();
            match handler {
                Some(handler) => {
                    if let Err(e) = handler.handle(task).await {
                        error!("Task {} failed: {}", task_id, e);
                    }
                }
                None => warn!("Task {} fired with no handler registered", task_id),
            }

            inner.tasks.lock().await.remove(&task_id);
        });
        tasks.insert(task_id, PendingEntry { join, started });

        debug!("Scheduled in-process task {} to fire at {}", task_id, fire_at);
        Ok(handle)
    }

    async fn cancel(&self, handle: &TaskHandle, terminate: bool) -> Result<(), TaskQueueError> {
        let mut tasks = self.inner.tasks.lock().await;
        match tasks.remove(&handle.task_id) {
            Some(entry) => {
                if terminate || !entry.started.load(Ordering::SeqCst) {
                    entry.join.abort();
                    debug!("Cancelled task {}", handle.task_id);
                } else {
                    debug!(
                        "Task {} already executing; left to finish (terminate = false)",
                        handle.task_id
                    );
                }
            }
            None => debug!(
                "Cancel of task {} found nothing pending (already fired or cancelled)",
                handle.task_id
            ),
        }
        Ok(())
    }
}
