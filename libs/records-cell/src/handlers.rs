use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateReportRequest, MedicationListQuery, PrescribeMedicationRequest};
use crate::services::medications::MedicationService;
use crate::services::reports::ReportService;

#[axum::debug_handler]
pub async fn prescribe_medication(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<PrescribeMedicationRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Auth(
            "Only doctors can prescribe medication".to_string(),
        ));
    }

    let service = MedicationService::new(&config);
    let medication = service
        .prescribe(request, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "medication": medication
    })))
}

#[axum::debug_handler]
pub async fn get_patient_medications(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Query(query): Query<MedicationListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = MedicationService::new(&config);
    let medications = service
        .list_for_patient(patient_id, query.status, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "total": medications.len(),
        "medications": medications
    })))
}

#[axum::debug_handler]
pub async fn discontinue_medication(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(medication_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Auth(
            "Only doctors can discontinue medication".to_string(),
        ));
    }

    let service = MedicationService::new(&config);
    let medication = service
        .discontinue(medication_id, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "medication": medication
    })))
}

#[axum::debug_handler]
pub async fn create_report(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateReportRequest>,
) -> Result<Json<Value>, AppError> {
    let uploaded_by = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("Invalid user id".to_string()))?;

    let service = ReportService::new(&config);
    let report = service
        .create(uploaded_by, request, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "report": report
    })))
}

#[axum::debug_handler]
pub async fn get_patient_reports(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ReportService::new(&config);
    let reports = service
        .list_for_patient(patient_id, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "total": reports.len(),
        "reports": reports
    })))
}

#[axum::debug_handler]
pub async fn get_report(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ReportService::new(&config);
    let report = service
        .get(report_id, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;

    Ok(Json(json!(report)))
}
