use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{
    generate_doctor_uid, CreateDoctorProfileRequest, DoctorProfile, DoctorSearchQuery,
    UpdateDoctorProfileRequest,
};

pub struct DoctorService {
    db: PostgrestClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn create_profile(
        &self,
        user_id: Uuid,
        request: CreateDoctorProfileRequest,
        auth_token: &str,
    ) -> Result<DoctorProfile> {
        debug!("Creating doctor profile for user {}", user_id);

        let existing: Vec<Value> = self
            .db
            .request(
                Method::GET,
                &format!(
                    "/rest/v1/doctor_profiles?license_number=eq.{}&select=id",
                    request.license_number
                ),
                Some(auth_token),
                None,
            )
            .await?;
        if !existing.is_empty() {
            return Err(anyhow!(
                "A doctor profile with license {} already exists",
                request.license_number
            ));
        }

        let profile_data = json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "uid": generate_doctor_uid(),
            "specialization": request.specialization,
            "license_number": request.license_number,
            "experience_years": request.experience_years,
            "education": request.education,
            "consultation_fee": request.consultation_fee,
            "bio": request.bio,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<DoctorProfile> = self
            .db
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctor_profiles",
                Some(auth_token),
                Some(profile_data),
                Some(headers),
            )
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Failed to create doctor profile"))
    }

    pub async fn get_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<DoctorProfile>> {
        let result: Vec<DoctorProfile> = self
            .db
            .request(
                Method::GET,
                &format!("/rest/v1/doctor_profiles?id=eq.{}", doctor_id),
                Some(auth_token),
                None,
            )
            .await?;

        Ok(result.into_iter().next())
    }

    pub async fn get_doctor_by_user(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Option<DoctorProfile>> {
        let result: Vec<DoctorProfile> = self
            .db
            .request(
                Method::GET,
                &format!("/rest/v1/doctor_profiles?user_id=eq.{}", user_id),
                Some(auth_token),
                None,
            )
            .await?;

        Ok(result.into_iter().next())
    }

    pub async fn search_doctors(
        &self,
        query: DoctorSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<DoctorProfile>> {
        debug!("Searching doctors: {:?}", query);

        let mut path = String::from("/rest/v1/doctor_profiles?order=experience_years.desc");
        if let Some(specialization) = query.specialization {
            path.push_str(&format!(
                "&specialization=eq.{}",
                serde_json::to_value(specialization)?
                    .as_str()
                    .unwrap_or_default()
            ));
        }
        path.push_str(&format!(
            "&limit={}&offset={}",
            query.limit.unwrap_or(50),
            query.offset.unwrap_or(0)
        ));

        let doctors: Vec<DoctorProfile> = self
            .db
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(doctors)
    }

    pub async fn update_profile(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorProfileRequest,
        auth_token: &str,
    ) -> Result<DoctorProfile> {
        debug!("Updating doctor profile {}", doctor_id);

        let mut update_data = serde_json::Map::new();
        if let Some(specialization) = request.specialization {
            update_data.insert("specialization".to_string(), json!(specialization));
        }
        if let Some(experience_years) = request.experience_years {
            update_data.insert("experience_years".to_string(), json!(experience_years));
        }
        if let Some(education) = request.education {
            update_data.insert("education".to_string(), json!(education));
        }
        if let Some(consultation_fee) = request.consultation_fee {
            update_data.insert("consultation_fee".to_string(), json!(consultation_fee));
        }
        if let Some(bio) = request.bio {
            update_data.insert("bio".to_string(), json!(bio));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<DoctorProfile> = self
            .db
            .request_with_headers(
                Method::PATCH,
                &format!("/rest/v1/doctor_profiles?id=eq.{}", doctor_id),
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Doctor profile not found"))
    }
}
