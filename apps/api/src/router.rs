use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::handlers::AppointmentState;
use appointment_cell::router::appointment_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::patient_routes;
use records_cell::router::records_routes;
use shared_config::AppConfig;

pub fn create_router(config: Arc<AppConfig>, appointments: Arc<AppointmentState>) -> Router {
    Router::new()
        .route("/", get(|| async { "WebDoctor API is running!" }))
        .nest("/doctors", doctor_routes(config.clone()))
        .nest("/patients", patient_routes(config.clone()))
        .nest("/records", records_routes(config.clone()))
        .nest("/appointments", appointment_routes(appointments))
}
