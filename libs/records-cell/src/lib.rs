pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Medication, MedicationStatus, Report, ReportType};
pub use services::medications::MedicationService;
pub use services::reports::ReportService;
