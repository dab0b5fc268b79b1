use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BloodType {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

/// Medical record of a patient. Vitals are recorded by the treating doctor;
/// the record itself is created once per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub uid: String,
    pub emergency_contact_number: String,
    pub chronic_conditions: Option<Vec<String>>,
    pub blood_type: Option<BloodType>,
    /// Height in centimeters.
    pub height: Option<f64>,
    /// Weight in kilograms.
    pub weight: Option<f64>,
    /// Body temperature in Celsius.
    pub body_temperature: Option<f64>,
    /// Heart rate in beats per minute.
    pub heart_rate: Option<i32>,
    /// Respiratory rate in breaths per minute.
    pub respiratory_rate: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An approved doctor/patient link. Created elsewhere through the
/// request/approval flow; read here as the booking precondition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientConnection {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub connected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePatientRecordRequest {
    pub emergency_contact_number: String,
    pub blood_type: Option<BloodType>,
    pub chronic_conditions: Option<Vec<String>>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateVitalsRequest {
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub body_temperature: Option<f64>,
    pub heart_rate: Option<i32>,
    pub respiratory_rate: Option<i32>,
}

/// `PATIENT-` followed by ten uppercase hex characters.
pub fn generate_patient_uid() -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..10].to_uppercase();
    format!("PATIENT-{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_has_prefix_and_fixed_length() {
        let uid = generate_patient_uid();
        assert!(uid.starts_with("PATIENT-"));
        assert_eq!(uid.len(), "PATIENT-".len() + 10);
    }

    #[test]
    fn blood_type_uses_clinical_notation() {
        assert_eq!(
            serde_json::to_value(BloodType::AbNegative).unwrap(),
            serde_json::json!("AB-")
        );
        let parsed: BloodType = serde_json::from_value(serde_json::json!("O+")).unwrap();
        assert_eq!(parsed, BloodType::OPositive);
    }
}
