use std::sync::Arc;

use chrono::Utc;
use futures::future::{AbortHandle, Abortable};
use tokio::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::scheduler::TaskHandler;
use crate::services::queue::RedisTaskQueue;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub poll_interval_ms: u64,
    pub claim_batch_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("task-worker-{}", Uuid::new_v4()),
            poll_interval_ms: 500,
            claim_batch_size: 16,
        }
    }
}

/// Polls the Redis queue for due tasks and dispatches each to the injected
/// handler on its own tokio task. Runs on a separate worker from whatever
/// scheduled the task; the abort registry on the queue is what lets
/// `cancel(handle, terminate = true)` interrupt a dispatch that is already
/// in flight in this process.
pub struct TaskWorker {
    config: WorkerConfig,
    queue: Arc<RedisTaskQueue>,
    handler: Arc<dyn TaskHandler>,
    is_shutdown: tokio::sync::RwLock<bool>,
}

impl TaskWorker {
    pub fn new(
        config: WorkerConfig,
        queue: Arc<RedisTaskQueue>,
        handler: Arc<dyn TaskHandler>,
    ) -> Self {
        Self {
            config,
            queue,
            handler,
            is_shutdown: tokio::sync::RwLock::new(false),
        }
    }

    #[instrument(skip(self), fields(worker_id = %self.config.worker_id))]
    pub async fn start(&self) {
        info!("Starting task worker {}", self.config.worker_id);

        loop {
            if *self.is_shutdown.read().await {
                debug!("Worker {} received shutdown signal", self.config.worker_id);
                break;
            }

            match self
                .queue
                .claim_due(Utc::now(), self.config.claim_batch_size)
                .await
            {
                Ok(tasks) => {
                    for task in tasks {
                        self.dispatch(task).await;
                    }
                }
                Err(e) => {
                    error!(
                        "Worker {} failed to claim due tasks: {}",
                        self.config.worker_id, e
                    );
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }

            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }

        info!("Task worker {} stopped", self.config.worker_id);
    }

    pub async fn shutdown(&self) {
        let mut is_shutdown = self.is_shutdown.write().await;
        *is_shutdown = true;
    }

    async fn dispatch(&self, task: crate::models::ScheduledTask) {
        let task_id = task.task_id;
        let kind = task.payload.kind();
        debug!("Dispatching {} task {}", kind, task_id);

        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        self.queue.register_running(task_id, abort_handle).await;

        let queue = Arc::clone(&self.queue);
        let handler = Arc::clone(&self.handler);
        tokio::spawn(async move {
            let result = Abortable::new(handler.handle(task), abort_registration).await;
            queue.clear_running(task_id).await;

            match result {
                Ok(Ok(())) => debug!("Task {} completed", task_id),
                Ok(Err(e)) => error!("Task {} failed: {}", task_id, e),
                Err(_aborted) => warn!("Task {} was terminated mid-execution", task_id),
            }
        });
    }
}
