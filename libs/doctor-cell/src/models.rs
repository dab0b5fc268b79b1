use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Specialization {
    Cardiology,
    Dermatology,
    Endocrinology,
    Gastroenterology,
    Neurology,
    Oncology,
    Orthopedics,
    Pediatrics,
    Psychiatry,
    Radiology,
    Surgery,
    General,
}

impl fmt::Display for Specialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Specialization::Cardiology => "Cardiology",
            Specialization::Dermatology => "Dermatology",
            Specialization::Endocrinology => "Endocrinology",
            Specialization::Gastroenterology => "Gastroenterology",
            Specialization::Neurology => "Neurology",
            Specialization::Oncology => "Oncology",
            Specialization::Orthopedics => "Orthopedics",
            Specialization::Pediatrics => "Pediatrics",
            Specialization::Psychiatry => "Psychiatry",
            Specialization::Radiology => "Radiology",
            Specialization::Surgery => "Surgery",
            Specialization::General => "General Medicine",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub uid: String,
    pub specialization: Specialization,
    pub license_number: String,
    pub experience_years: i32,
    pub education: String,
    pub consultation_fee: f64,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDoctorProfileRequest {
    pub specialization: Specialization,
    pub license_number: String,
    pub experience_years: i32,
    pub education: String,
    pub consultation_fee: f64,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDoctorProfileRequest {
    pub specialization: Option<Specialization>,
    pub experience_years: Option<i32>,
    pub education: Option<String>,
    pub consultation_fee: Option<f64>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorSearchQuery {
    pub specialization: Option<Specialization>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

/// `DOCTOR-` followed by ten uppercase hex characters.
pub fn generate_doctor_uid() -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..10].to_uppercase();
    format!("DOCTOR-{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_has_prefix_and_fixed_length() {
        let uid = generate_doctor_uid();
        assert!(uid.starts_with("DOCTOR-"));
        assert_eq!(uid.len(), "DOCTOR-".len() + 10);
    }

    #[test]
    fn specialization_round_trips_as_screaming_snake_case() {
        assert_eq!(
            serde_json::to_value(Specialization::Gastroenterology).unwrap(),
            serde_json::json!("GASTROENTEROLOGY")
        );
        let parsed: Specialization = serde_json::from_value(serde_json::json!("GENERAL")).unwrap();
        assert_eq!(parsed, Specialization::General);
    }
}
