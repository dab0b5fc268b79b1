use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use deadpool_redis::{Config, Connection, Pool, Runtime};
use futures::future::AbortHandle;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{ScheduledTask, TaskHandle, TaskPayload, TaskQueueError};
use crate::scheduler::{TaskScheduler, SCHEDULE_GRACE_SECONDS};

/// How long a cancellation tombstone outlives the cancel call. Covers the
/// window where a worker claims a task the scheduler just cancelled.
const TOMBSTONE_TTL_SECONDS: i64 = 86_400;

/// Redis-backed delayed task queue.
///
/// Task bodies live in a hash keyed by task id; due times live in a sorted
/// set scored by the fire timestamp. A worker claims due members with an
/// atomic ZREM, which is what gives at-most-one execution per task: only the
/// claimer that removed the member dispatches it.
pub struct RedisTaskQueue {
    pool: Pool,
    running: Arc<Mutex<HashMap<Uuid, AbortHandle>>>,
}

impl RedisTaskQueue {
    pub async fn new(config: &AppConfig) -> Result<Self, TaskQueueError> {
        let redis_url = config
            .redis_url
            .clone()
            .ok_or(TaskQueueError::NotConfigured)?;

        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| TaskQueueError::Pool(format!("failed to create Redis pool: {}", e)))?;

        // Fail fast on an unreachable Redis rather than at first schedule.
        let mut conn = pool
            .get()
            .await
            .map_err(|e| TaskQueueError::Pool(format!("failed to connect to Redis: {}", e)))?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis task queue initialized successfully");

        Ok(Self {
            pool,
            running: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn task_key(task_id: Uuid) -> String {
        format!("deferred_task:{}", task_id)
    }

    fn tombstone_key(task_id: Uuid) -> String {
        format!("deferred_task:cancelled:{}", task_id)
    }

    const DUE_SET_KEY: &'static str = "deferred_tasks:due";

    async fn get_connection(&self) -> Result<Connection, TaskQueueError> {
        self.pool
            .get()
            .await
            .map_err(|e| TaskQueueError::Pool(format!("failed to get Redis connection: {}", e)))
    }

    /// Claim up to `limit` tasks whose fire time has passed. Claiming is an
    /// atomic ZREM per member, so two workers polling concurrently never
    /// dispatch the same task twice.
    pub async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduledTask>, TaskQueueError> {
        let mut conn = self.get_connection().await?;

        let due_ids: Vec<String> = conn
            .zrangebyscore_limit(Self::DUE_SET_KEY, "-inf", now.timestamp(), 0, limit as isize)
            .await?;

        let mut claimed = Vec::new();
        for id_str in due_ids {
            let removed: i64 = conn.zrem(Self::DUE_SET_KEY, &id_str).await?;
            if removed == 0 {
                // Another worker claimed it first.
                continue;
            }

            let task_id = match Uuid::parse_str(&id_str) {
                Ok(id) => id,
                Err(_) => {
                    warn!("Dropping malformed task id in due set: {}", id_str);
                    continue;
                }
            };

            let tombstoned: bool = conn.exists(Self::tombstone_key(task_id)).await?;
            if tombstoned {
                debug!("Skipping cancelled task {}", task_id);
                let _: () = conn.del(Self::task_key(task_id)).await?;
                continue;
            }

            let data: Option<String> = conn.hget(Self::task_key(task_id), "data").await?;
            let _: () = conn.del(Self::task_key(task_id)).await?;

            match data {
                Some(data) => match serde_json::from_str::<ScheduledTask>(&data) {
                    Ok(task) => claimed.push(task),
                    Err(e) => error!("Failed to deserialize task {}: {}", task_id, e),
                },
                None => warn!("Task {} was due but its body is gone", task_id),
            }
        }

        Ok(claimed)
    }

    /// Register the abort handle of a task that is executing in this process.
    pub async fn register_running(&self, task_id: Uuid, abort: AbortHandle) {
        self.running.lock().await.insert(task_id, abort);
    }

    pub async fn clear_running(&self, task_id: Uuid) {
        self.running.lock().await.remove(&task_id);
    }

    async fn abort_if_running(&self, task_id: Uuid) {
        if let Some(abort) = self.running.lock().await.remove(&task_id) {
            warn!("Terminating task {} mid-execution", task_id);
            abort.abort();
        }
    }
}

#[async_trait::async_trait]
impl TaskScheduler for RedisTaskQueue {
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
        let data = serde_json::to_string(&task)?;

        let mut conn = self.get_connection().await?;

        let task_key = Self::task_key(task.task_id);
        let _: () = conn
            .hset_multiple(
                &task_key,
                &[
                    ("data", data.as_str()),
                    ("kind", task.payload.kind()),
                    ("fire_at", &task.fire_at.to_rfc3339()),
                ],
            )
            .await?;

        // Bodies expire well after the fire time so a stalled worker never
        // claims a member whose hash has already vanished.
        let ttl = (fire_at - Utc::now()).num_seconds().max(0) + TOMBSTONE_TTL_SECONDS;
        let _: () = conn.expire(&task_key, ttl).await?;

        let _: () = conn
            .zadd(Self::DUE_SET_KEY, task.task_id.to_string(), fire_at.timestamp())
            .await?;

        debug!(
            "Scheduled {} task {} to fire at {}",
            task.payload.kind(),
            task.task_id,
            fire_at
        );
        Ok(handle)
    }

    async fn cancel(&self, handle: &TaskHandle, terminate: bool) -> Result<(), TaskQueueError> {
        let mut conn = self.get_connection().await?;

        // Order matters: drop the pending entry before tombstoning, so a
        // worker that raced the ZREM still sees the tombstone.
        let removed: i64 = conn
            .zrem(Self::DUE_SET_KEY, handle.task_id.to_string())
            .await?;
        let _: () = conn
            .set_ex(
                Self::tombstone_key(handle.task_id),
                "1",
                TOMBSTONE_TTL_SECONDS as u64,
            )
            .await?;
        let _: () = conn.del(Self::task_key(handle.task_id)).await?;

        if terminate {
            self.abort_if_running(handle.task_id).await;
        }

        if removed > 0 {
            debug!("Cancelled pending task {}", handle.task_id);
        } else {
            debug!(
                "Cancel of task {} found no pending entry (already fired or cancelled)",
                handle.task_id
            );
        }
        Ok(())
    }
}
