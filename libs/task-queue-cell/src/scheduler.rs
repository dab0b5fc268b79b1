use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{ScheduledTask, TaskHandle, TaskPayload, TaskQueueError};

/// Fire times may lag behind the clock by this much and still be accepted;
/// anything older is rejected as unschedulable.
pub(crate) const SCHEDULE_GRACE_SECONDS: i64 = 60;

/// Contract the appointment lifecycle consumes from the deferred task queue.
///
/// Implementations guarantee at-most-one execution per scheduled task absent
/// cancellation, and must tolerate `cancel` on handles that have already
/// fired or been cancelled.
#[async_trait]
pub trait TaskScheduler: Send + Sync {
    /// Schedule `payload` to run once at `fire_at`. Fire times further in the
    /// past than a short grace window are rejected.
    async fn schedule(
        &self,
        payload: TaskPayload,
        fire_at: DateTime<Utc>,
    ) -> Result<TaskHandle, TaskQueueError>;

    /// Cancel a scheduled task. With `terminate = true` a task already
    /// mid-execution in this process is aborted as well; otherwise only the
    /// pending entry is dropped.
    async fn cancel(&self, handle: &TaskHandle, terminate: bool) -> Result<(), TaskQueueError>;
}

/// Callback invoked by the worker (or the in-process scheduler) when a task
/// comes due.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: ScheduledTask) -> anyhow::Result<()>;
}
