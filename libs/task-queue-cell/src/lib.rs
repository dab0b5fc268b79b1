pub mod models;
pub mod scheduler;
pub mod services;

pub use models::{ScheduledTask, TaskHandle, TaskPayload, TaskQueueError};
pub use scheduler::{TaskHandler, TaskScheduler};
pub use services::memory::InMemoryTaskScheduler;
pub use services::queue::RedisTaskQueue;
pub use services::worker::{TaskWorker, WorkerConfig};
