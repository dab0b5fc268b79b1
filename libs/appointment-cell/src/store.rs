use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

/// Persistence contract of the appointment lifecycle.
///
/// The lifecycle relies on per-record read-modify-write: `fetch` then
/// `update` against the single source of truth is what arbitrates the
/// cancel-versus-complete race.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: &Appointment) -> Result<(), AppointmentError>;

    async fn update(&self, appointment: &Appointment) -> Result<(), AppointmentError>;

    async fn fetch(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError>;

    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn list_for_patient(
        &self,
        patient_id: Uuid,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn doctor_exists(&self, doctor_id: Uuid) -> Result<bool, AppointmentError>;

    async fn patient_exists(&self, patient_id: Uuid) -> Result<bool, AppointmentError>;

    /// Whether the doctor/patient connection (established elsewhere via
    /// request and approval) exists. Booking precondition only; never
    /// written from here.
    async fn are_connected(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
    ) -> Result<bool, AppointmentError>;
}

/// Appointment store over the PostgREST data API. Uses the service key held
/// by the client rather than per-caller tokens so the deferred task worker
/// can write without a user session.
pub struct PostgrestAppointmentStore {
    db: PostgrestClient,
}

impl PostgrestAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    fn list_path(owner_column: &str, owner_id: Uuid, status: Option<AppointmentStatus>) -> String {
        let mut path = format!(
            "/rest/v1/appointments?{}=eq.{}&order=date_time.desc",
            owner_column, owner_id
        );
        if let Some(status) = status {
            path.push_str(&format!("&status=eq.{}", status));
        }
        path
    }
}

#[async_trait]
impl AppointmentStore for PostgrestAppointmentStore {
    async fn insert(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        debug!("Inserting appointment {}", appointment.id);

        let body = serde_json::to_value(appointment)
            .map_err(|e| AppointmentError::Storage(e.to_string()))?;

        let created: Vec<Appointment> = self
            .db
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                None,
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::Storage(e.to_string()))?;

        if created.is_empty() {
            return Err(AppointmentError::Storage(
                "insert returned no appointment row".to_string(),
            ));
        }
        Ok(())
    }

    async fn update(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        debug!("Updating appointment {}", appointment.id);

        let body = serde_json::to_value(appointment)
            .map_err(|e| AppointmentError::Storage(e.to_string()))?;

        let updated: Vec<Appointment> = self
            .db
            .request_with_headers(
                Method::PATCH,
                &format!("/rest/v1/appointments?id=eq.{}", appointment.id),
                None,
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::Storage(e.to_string()))?;

        if updated.is_empty() {
            return Err(AppointmentError::NotFound);
        }
        Ok(())
    }

    async fn fetch(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let result: Vec<Appointment> = self
            .db
            .request(
                Method::GET,
                &format!("/rest/v1/appointments?id=eq.{}", appointment_id),
                None,
                None,
            )
            .await
            .map_err(|e| AppointmentError::Storage(e.to_string()))?;

        result.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.db
            .request(
                Method::GET,
                &Self::list_path("doctor_id", doctor_id, status),
                None,
                None,
            )
            .await
            .map_err(|e| AppointmentError::Storage(e.to_string()))
    }

    async fn list_for_patient(
        &self,
        patient_id: Uuid,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.db
            .request(
                Method::GET,
                &Self::list_path("patient_id", patient_id, status),
                None,
                None,
            )
            .await
            .map_err(|e| AppointmentError::Storage(e.to_string()))
    }

    async fn doctor_exists(&self, doctor_id: Uuid) -> Result<bool, AppointmentError> {
        let rows: Vec<Value> = self
            .db
            .request(
                Method::GET,
                &format!("/rest/v1/doctor_profiles?id=eq.{}&select=id", doctor_id),
                None,
                None,
            )
            .await
            .map_err(|e| AppointmentError::Storage(e.to_string()))?;
        Ok(!rows.is_empty())
    }

    async fn patient_exists(&self, patient_id: Uuid) -> Result<bool, AppointmentError> {
        let rows: Vec<Value> = self
            .db
            .request(
                Method::GET,
                &format!("/rest/v1/patient_records?id=eq.{}&select=id", patient_id),
                None,
                None,
            )
            .await
            .map_err(|e| AppointmentError::Storage(e.to_string()))?;
        Ok(!rows.is_empty())
    }

    async fn are_connected(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
    ) -> Result<bool, AppointmentError> {
        let rows: Vec<Value> = self
            .db
            .request(
                Method::GET,
                &format!(
                    "/rest/v1/patient_connections?doctor_id=eq.{}&patient_id=eq.{}&select=id",
                    doctor_id, patient_id
                ),
                None,
                None,
            )
            .await
            .map_err(|e| AppointmentError::Storage(e.to_string()))?;
        Ok(!rows.is_empty())
    }
}
