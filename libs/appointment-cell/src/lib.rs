pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use models::{Appointment, AppointmentError, AppointmentStatus};
pub use services::completion::AppointmentTaskHandler;
pub use services::lifecycle::AppointmentLifecycleService;
pub use store::{AppointmentStore, PostgrestAppointmentStore};
