use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{CreateReportRequest, Report};

pub struct ReportService {
    db: PostgrestClient,
}

impl ReportService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn create(
        &self,
        uploaded_by: Uuid,
        request: CreateReportRequest,
        auth_token: &str,
    ) -> Result<Report> {
        debug!(
            "Recording {} report '{}' for patient {}",
            serde_json::to_value(request.report_type)?
                .as_str()
                .unwrap_or_default(),
            request.title,
            request.patient_id
        );

        let report_data = json!({
            "id": Uuid::new_v4(),
            "patient_id": request.patient_id,
            "uploaded_by": uploaded_by,
            "title": request.title,
            "report_type": request.report_type,
            "report_date": request.report_date,
            "uploaded_at": Utc::now().to_rfc3339(),
            "file_path": request.file_path,
            "description": request.description,
            "lab_facility": request.lab_facility
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Report> = self
            .db
            .request_with_headers(
                Method::POST,
                "/rest/v1/reports",
                Some(auth_token),
                Some(report_data),
                Some(headers),
            )
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Failed to record report"))
    }

    /// Newest test dates first, matching how clinicians read a chart.
    pub async fn list_for_patient(&self, patient_id: Uuid, auth_token: &str) -> Result<Vec<Report>> {
        let reports: Vec<Report> = self
            .db
            .request(
                Method::GET,
                &format!(
                    "/rest/v1/reports?patient_id=eq.{}&order=report_date.desc,uploaded_at.desc",
                    patient_id
                ),
                Some(auth_token),
                None,
            )
            .await?;
        Ok(reports)
    }

    pub async fn get(&self, report_id: Uuid, auth_token: &str) -> Result<Option<Report>> {
        let result: Vec<Report> = self
            .db
            .request(
                Method::GET,
                &format!("/rest/v1/reports?id=eq.{}", report_id),
                Some(auth_token),
                None,
            )
            .await?;
        Ok(result.into_iter().next())
    }
}
