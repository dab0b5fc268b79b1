use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{
    generate_patient_uid, CreatePatientRecordRequest, PatientConnection, PatientRecord,
    UpdateVitalsRequest,
};

pub struct PatientService {
    db: PostgrestClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn create_record(
        &self,
        user_id: Uuid,
        request: CreatePatientRecordRequest,
        auth_token: &str,
    ) -> Result<PatientRecord> {
        debug!("Creating patient record for user {}", user_id);

        let existing: Vec<Value> = self
            .db
            .request(
                Method::GET,
                &format!("/rest/v1/patient_records?user_id=eq.{}&select=id", user_id),
                Some(auth_token),
                None,
            )
            .await?;
        if !existing.is_empty() {
            return Err(anyhow!("A patient record already exists for this user"));
        }

        let record_data = json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "uid": generate_patient_uid(),
            "emergency_contact_number": request.emergency_contact_number,
            "blood_type": request.blood_type,
            "chronic_conditions": request.chronic_conditions,
            "height": request.height,
            "weight": request.weight,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<PatientRecord> = self
            .db
            .request_with_headers(
                Method::POST,
                "/rest/v1/patient_records",
                Some(auth_token),
                Some(record_data),
                Some(headers),
            )
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Failed to create patient record"))
    }

    pub async fn get_record(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<PatientRecord>> {
        let result: Vec<PatientRecord> = self
            .db
            .request(
                Method::GET,
                &format!("/rest/v1/patient_records?id=eq.{}", patient_id),
                Some(auth_token),
                None,
            )
            .await?;

        Ok(result.into_iter().next())
    }

    pub async fn get_record_by_user(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Option<PatientRecord>> {
        let result: Vec<PatientRecord> = self
            .db
            .request(
                Method::GET,
                &format!("/rest/v1/patient_records?user_id=eq.{}", user_id),
                Some(auth_token),
                None,
            )
            .await?;

        Ok(result.into_iter().next())
    }

    pub async fn update_vitals(
        &self,
        patient_id: Uuid,
        request: UpdateVitalsRequest,
        auth_token: &str,
    ) -> Result<PatientRecord> {
        debug!("Updating vitals for patient {}", patient_id);

        let mut update_data = serde_json::Map::new();
        if let Some(height) = request.height {
            update_data.insert("height".to_string(), json!(height));
        }
        if let Some(weight) = request.weight {
            update_data.insert("weight".to_string(), json!(weight));
        }
        if let Some(body_temperature) = request.body_temperature {
            update_data.insert("body_temperature".to_string(), json!(body_temperature));
        }
        if let Some(heart_rate) = request.heart_rate {
            update_data.insert("heart_rate".to_string(), json!(heart_rate));
        }
        if let Some(respiratory_rate) = request.respiratory_rate {
            update_data.insert("respiratory_rate".to_string(), json!(respiratory_rate));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<PatientRecord> = self
            .db
            .request_with_headers(
                Method::PATCH,
                &format!("/rest/v1/patient_records?id=eq.{}", patient_id),
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Patient record not found"))
    }

    /// Connections approved for a doctor, newest first.
    pub async fn list_connections_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<PatientConnection>> {
        let connections: Vec<PatientConnection> = self
            .db
            .request(
                Method::GET,
                &format!(
                    "/rest/v1/patient_connections?doctor_id=eq.{}&order=connected_at.desc",
                    doctor_id
                ),
                Some(auth_token),
                None,
            )
            .await?;
        Ok(connections)
    }

    pub async fn is_connected(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<bool> {
        let rows: Vec<Value> = self
            .db
            .request(
                Method::GET,
                &format!(
                    "/rest/v1/patient_connections?doctor_id=eq.{}&patient_id=eq.{}&select=id",
                    doctor_id, patient_id
                ),
                Some(auth_token),
                None,
            )
            .await?;
        Ok(!rows.is_empty())
    }
}
