use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreatePatientRecordRequest, UpdateVitalsRequest};
use crate::services::patient::PatientService;

#[axum::debug_handler]
pub async fn create_patient_record(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRecordRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("Invalid user id".to_string()))?;

    let service = PatientService::new(&config);
    let record = service
        .create_record(user_id, request, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(record)))
}

#[axum::debug_handler]
pub async fn get_patient_record(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let record = service
        .get_record(patient_id, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Patient record not found".to_string()))?;

    Ok(Json(json!(record)))
}

#[axum::debug_handler]
pub async fn get_my_patient_record(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let record = service
        .get_record_by_user(&user.id, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Patient record not found".to_string()))?;

    Ok(Json(json!(record)))
}

#[axum::debug_handler]
pub async fn update_vitals(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdateVitalsRequest>,
) -> Result<Json<Value>, AppError> {
    // Vitals are recorded during a consultation by the treating doctor.
    if !user.is_doctor() {
        return Err(AppError::Auth(
            "Only doctors can record patient vitals".to_string(),
        ));
    }

    let service = PatientService::new(&config);
    let record = service
        .update_vitals(patient_id, request, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(record)))
}

#[axum::debug_handler]
pub async fn list_doctor_connections(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let connections = service
        .list_connections_for_doctor(doctor_id, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "total": connections.len(),
        "connections": connections
    })))
}
