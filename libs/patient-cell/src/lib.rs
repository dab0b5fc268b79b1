pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{BloodType, PatientConnection, PatientRecord};
pub use services::patient::PatientService;
