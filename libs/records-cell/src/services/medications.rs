use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{Medication, MedicationStatus, PrescribeMedicationRequest};

pub struct MedicationService {
    db: PostgrestClient,
}

impl MedicationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn prescribe(
        &self,
        request: PrescribeMedicationRequest,
        auth_token: &str,
    ) -> Result<Medication> {
        debug!(
            "Doctor {} prescribing {} for patient {}",
            request.doctor_id, request.name, request.patient_id
        );

        let medication_data = json!({
            "id": Uuid::new_v4(),
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "name": request.name,
            "dosage_mg": request.dosage_mg,
            "frequency": request.frequency,
            "start_date": request.start_date,
            "duration_days": request.duration_days,
            "status": MedicationStatus::Active,
            "date_issued": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Medication> = self
            .db
            .request_with_headers(
                Method::POST,
                "/rest/v1/medications",
                Some(auth_token),
                Some(medication_data),
                Some(headers),
            )
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Failed to create prescription"))
    }

    pub async fn list_for_patient(
        &self,
        patient_id: Uuid,
        status: Option<MedicationStatus>,
        auth_token: &str,
    ) -> Result<Vec<Medication>> {
        let mut path = format!(
            "/rest/v1/medications?patient_id=eq.{}&order=date_issued.desc",
            patient_id
        );
        if let Some(status) = status {
            path.push_str(&format!(
                "&status=eq.{}",
                serde_json::to_value(status)?.as_str().unwrap_or_default()
            ));
        }

        let medications: Vec<Medication> = self
            .db
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(medications)
    }

    pub async fn get(&self, medication_id: Uuid, auth_token: &str) -> Result<Option<Medication>> {
        let result: Vec<Medication> = self
            .db
            .request(
                Method::GET,
                &format!("/rest/v1/medications?id=eq.{}", medication_id),
                Some(auth_token),
                None,
            )
            .await?;
        Ok(result.into_iter().next())
    }

    pub async fn discontinue(&self, medication_id: Uuid, auth_token: &str) -> Result<Medication> {
        debug!("Discontinuing medication {}", medication_id);

        let update_data = json!({ "status": MedicationStatus::Discontinued });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Medication> = self
            .db
            .request_with_headers(
                Method::PATCH,
                &format!("/rest/v1/medications?id=eq.{}", medication_id),
                Some(auth_token),
                Some(update_data),
                Some(headers),
            )
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Medication not found"))
    }
}
