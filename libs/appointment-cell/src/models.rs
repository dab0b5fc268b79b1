use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use task_queue_cell::TaskQueueError;
use video_room_cell::RoomProviderError;

/// A booked video consultation between one doctor and one patient.
///
/// The room id, room name and both join links are assigned exactly once at
/// creation and never regenerated; rescheduling only moves the date and the
/// deferred completion task. `task_id` references the pending completion
/// task, of which there is at most one at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub room_id: String,
    pub room_name: String,
    pub doctor_join_url: String,
    pub patient_join_url: String,
    pub description: Option<String>,
    pub task_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Completed and cancelled are terminal; nothing transitions out of them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_date_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<AppointmentStatus>,
}

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("appointment not found")]
    NotFound,

    #[error("doctor not found")]
    DoctorNotFound,

    #[error("patient not found")]
    PatientNotFound,

    #[error("doctor and patient are not connected")]
    NotConnected,

    #[error("appointment is already {0}")]
    AlreadyTerminal(AppointmentStatus),

    #[error("room provider error: {0}")]
    Provider(#[from] RoomProviderError),

    #[error("task scheduling error: {0}")]
    Scheduling(#[from] TaskQueueError),

    #[error("storage error: {0}")]
    Storage(String),
}
