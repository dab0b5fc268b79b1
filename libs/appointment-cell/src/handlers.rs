use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use task_queue_cell::TaskQueueError;

use crate::models::{
    AppointmentError, AppointmentListQuery, CreateAppointmentRequest,
    RescheduleAppointmentRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;

/// Shared state of the appointment routes: the lifecycle service is built
/// once at startup with its injected collaborators, not per request.
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub lifecycle: Arc<AppointmentLifecycleService>,
}

fn map_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        AppointmentError::PatientNotFound => AppError::NotFound("Patient not found".to_string()),
        AppointmentError::NotConnected => {
            AppError::BadRequest("Doctor and patient are not connected".to_string())
        }
        AppointmentError::AlreadyTerminal(status) => {
            AppError::Conflict(format!("Appointment is already {}", status))
        }
        AppointmentError::Provider(e) => AppError::ExternalService(e.to_string()),
        AppointmentError::Scheduling(TaskQueueError::FireTimeInPast { .. }) => {
            AppError::BadRequest("Appointment time is too far in the past".to_string())
        }
        AppointmentError::Scheduling(e) => AppError::Internal(e.to_string()),
        AppointmentError::Storage(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Auth(
            "Only doctors can book appointments".to_string(),
        ));
    }

    let appointment = state
        .lifecycle
        .create(request)
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .lifecycle
        .get(appointment_id)
        .await
        .map_err(map_error)?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Auth(
            "Only doctors can reschedule appointments".to_string(),
        ));
    }

    let appointment = state
        .lifecycle
        .reschedule(appointment_id, request.new_date_time)
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled successfully"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .lifecycle
        .cancel(appointment_id)
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<Arc<AppointmentState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AppointmentListQuery>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointments = state
        .lifecycle
        .list_for_doctor(doctor_id, query.status)
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "count": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<AppointmentState>>,
    Path(patient_id): Path<Uuid>,
    Query(query): Query<AppointmentListQuery>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointments = state
        .lifecycle
        .list_for_patient(patient_id, query.status)
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "count": appointments.len(),
        "appointments": appointments
    })))
}
