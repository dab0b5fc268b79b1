use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MedicationStatus {
    Active,
    Discontinued,
}

/// A prescription written by a doctor for a connected patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub name: String,
    /// Dose per intake in milligrams.
    pub dosage_mg: i32,
    /// Free text, e.g. "Twice a day".
    pub frequency: String,
    pub start_date: NaiveDate,
    pub duration_days: i32,
    pub status: MedicationStatus,
    pub date_issued: DateTime<Utc>,
}

impl Medication {
    /// Last day the medication should be taken.
    pub fn end_date(&self) -> NaiveDate {
        self.start_date + Duration::days(self.duration_days as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    BloodTest,
    XRay,
    Mri,
    CtScan,
    Ultrasound,
    Ecg,
    Echo,
    Biopsy,
    Pathology,
    Other,
}

/// Metadata of an uploaded medical report. The file itself lives in external
/// storage; only its path is recorded here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub uploaded_by: Option<Uuid>,
    pub title: String,
    pub report_type: ReportType,
    /// Date the test or procedure was conducted.
    pub report_date: NaiveDate,
    pub uploaded_at: DateTime<Utc>,
    pub file_path: String,
    pub description: Option<String>,
    pub lab_facility: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrescribeMedicationRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub name: String,
    pub dosage_mg: i32,
    pub frequency: String,
    pub start_date: NaiveDate,
    pub duration_days: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReportRequest {
    pub patient_id: Uuid,
    pub title: String,
    pub report_type: ReportType,
    pub report_date: NaiveDate,
    pub file_path: String,
    pub description: Option<String>,
    pub lab_facility: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MedicationListQuery {
    pub status: Option<MedicationStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_date_adds_duration_to_start() {
        let medication = Medication {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            name: "Amoxicillin".to_string(),
            dosage_mg: 500,
            frequency: "Three times a day".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            duration_days: 7,
            status: MedicationStatus::Active,
            date_issued: Utc::now(),
        };

        assert_eq!(
            medication.end_date(),
            NaiveDate::from_ymd_opt(2025, 1, 8).unwrap()
        );
    }

    #[test]
    fn report_type_serializes_as_screaming_snake_case() {
        assert_eq!(
            serde_json::to_value(ReportType::XRay).unwrap(),
            serde_json::json!("X_RAY")
        );
        assert_eq!(
            serde_json::to_value(ReportType::CtScan).unwrap(),
            serde_json::json!("CT_SCAN")
        );
    }
}
