use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use task_queue_cell::{ScheduledTask, TaskHandler, TaskPayload};

use crate::services::lifecycle::AppointmentLifecycleService;

/// Routes fired deferred tasks back into the lifecycle manager.
///
/// Registered with the task worker (or the in-process scheduler) at startup;
/// runs outside any HTTP request.
pub struct AppointmentTaskHandler {
    lifecycle: Arc<AppointmentLifecycleService>,
}

impl AppointmentTaskHandler {
    pub fn new(lifecycle: Arc<AppointmentLifecycleService>) -> Self {
        Self { lifecycle }
    }
}

#[async_trait]
impl TaskHandler for AppointmentTaskHandler {
    async fn handle(&self, task: ScheduledTask) -> anyhow::Result<()> {
        debug!("Handling {} task {}", task.payload.kind(), task.task_id);

        match task.payload {
            TaskPayload::CompleteAppointment {
                room_id,
                appointment_id,
            } => {
                self.lifecycle
                    .on_completion_fire(&room_id, appointment_id)
                    .await?;
            }
            TaskPayload::DisableRoom { room_id } => {
                self.lifecycle.disable_room_cleanup(&room_id).await?;
            }
        }
        Ok(())
    }
}
