use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use task_queue_cell::{
    InMemoryTaskScheduler, ScheduledTask, TaskHandler, TaskPayload, TaskQueueError, TaskScheduler,
};

struct RecordingHandler {
    fired: Mutex<Vec<TaskPayload>>,
    work_duration: Duration,
}

impl RecordingHandler {
    fn new() -> Self {
        Self {
            fired: Mutex::new(Vec::new()),
            work_duration: Duration::ZERO,
        }
    }

    fn slow(work_duration: Duration) -> Self {
        Self {
            fired: Mutex::new(Vec::new()),
            work_duration,
        }
    }

    async fn fired(&self) -> Vec<TaskPayload> {
        self.fired.lock().await.clone()
    }
}

#[async_trait]
impl TaskHandler for RecordingHandler {
    async fn handle(&self, task: ScheduledTask) -> anyhow::Result<()> {
        if !self.work_duration.is_zero() {
            tokio::time::sleep(self.work_duration).await;
        }
        self.fired.lock().await.push(task.payload);
        Ok(())
    }
}

fn complete_payload() -> TaskPayload {
    TaskPayload::CompleteAppointment {
        room_id: "room-123".to_string(),
        appointment_id: uuid::Uuid::new_v4(),
    }
}

#[tokio::test(start_paused = true)]
async fn task_fires_handler_once_at_fire_time() {
    let scheduler = InMemoryTaskScheduler::new();
    let handler = Arc::new(RecordingHandler::new());
    scheduler.set_handler(handler.clone()).await;

    let payload = complete_payload();
    scheduler
        .schedule(payload.clone(), Utc::now() + chrono::Duration::minutes(30))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(29 * 60)).await;
    assert!(handler.fired().await.is_empty(), "task fired early");

    tokio::time::sleep(Duration::from_secs(2 * 60)).await;
    assert_eq!(handler.fired().await, vec![payload]);
    assert_eq!(scheduler.pending_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_task_never_fires() {
    let scheduler = InMemoryTaskScheduler::new();
    let handler = Arc::new(RecordingHandler::new());
    scheduler.set_handler(handler.clone()).await;

    let handle = scheduler
        .schedule(complete_payload(), Utc::now() + chrono::Duration::minutes(30))
        .await
        .unwrap();
    scheduler.cancel(&handle, false).await.unwrap();

    tokio::time::sleep(Duration::from_secs(60 * 60)).await;
    assert!(handler.fired().await.is_empty());
    assert_eq!(scheduler.pending_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn fire_time_beyond_grace_window_is_rejected() {
    let scheduler = InMemoryTaskScheduler::new();

    let result = scheduler
        .schedule(complete_payload(), Utc::now() - chrono::Duration::minutes(10))
        .await;

    assert_matches!(result, Err(TaskQueueError::FireTimeInPast { .. }));
}

#[tokio::test(start_paused = true)]
async fn fire_time_within_grace_window_fires_immediately() {
    let scheduler = InMemoryTaskScheduler::new();
    let handler = Arc::new(RecordingHandler::new());
    scheduler.set_handler(handler.clone()).await;

    scheduler
        .schedule(complete_payload(), Utc::now() - chrono::Duration::seconds(30))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(handler.fired().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn terminate_aborts_a_task_mid_execution() {
    let scheduler = InMemoryTaskScheduler::new();
    let handler = Arc::new(RecordingHandler::slow(Duration::from_secs(60)));
    scheduler.set_handler(handler.clone()).await;

    let handle = scheduler
        .schedule(complete_payload(), Utc::now())
        .await
        .unwrap();

    // Let the handler start and block on its own work.
    tokio::time::sleep(Duration::from_millis(10)).await;
    scheduler.cancel(&handle, true).await.unwrap();

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(
        handler.fired().await.is_empty(),
        "terminated task still completed"
    );
}

#[tokio::test(start_paused = true)]
async fn plain_cancel_leaves_a_running_task_to_finish() {
    let scheduler = InMemoryTaskScheduler::new();
    let handler = Arc::new(RecordingHandler::slow(Duration::from_secs(60)));
    scheduler.set_handler(handler.clone()).await;

    let handle = scheduler
        .schedule(complete_payload(), Utc::now())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    scheduler.cancel(&handle, false).await.unwrap();

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(handler.fired().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelling_an_already_fired_handle_is_a_noop() {
    let scheduler = InMemoryTaskScheduler::new();
    let handler = Arc::new(RecordingHandler::new());
    scheduler.set_handler(handler.clone()).await;

    let handle = scheduler
        .schedule(complete_payload(), Utc::now())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(handler.fired().await.len(), 1);

    scheduler.cancel(&handle, true).await.unwrap();
    scheduler.cancel(&handle, false).await.unwrap();
    assert_eq!(handler.fired().await.len(), 1);
}
