use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A unit of deferred work together with the moment it should run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub task_id: Uuid,
    pub payload: TaskPayload,
    pub fire_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ScheduledTask {
    pub fn new(payload: TaskPayload, fire_at: DateTime<Utc>) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            payload,
            fire_at,
            created_at: Utc::now(),
        }
    }

    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            task_id: self.task_id,
        }
    }
}

/// Typed payload dispatched to the registered handler when a task fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskPayload {
    /// Auto-complete an appointment after its visit window has elapsed.
    CompleteAppointment {
        room_id: String,
        appointment_id: Uuid,
    },
    /// Tear down a provider room without touching appointment state.
    DisableRoom { room_id: String },
}

impl TaskPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            TaskPayload::CompleteAppointment { .. } => "complete_appointment",
            TaskPayload::DisableRoom { .. } => "disable_room",
        }
    }
}

/// Cancellable reference to a scheduled task. Safe to hold after the task
/// has fired or been cancelled; cancelling a dead handle is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_id: Uuid,
}

#[derive(Error, Debug)]
pub enum TaskQueueError {
    #[error("task scheduler is not configured")]
    NotConfigured,

    #[error("fire time {fire_at} is more than {grace_seconds}s in the past")]
    FireTimeInPast {
        fire_at: DateTime<Utc>,
        grace_seconds: i64,
    },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    Pool(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("task handler error: {0}")]
    Handler(String),
}
