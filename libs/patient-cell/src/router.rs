use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn patient_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::create_patient_record))
        .route("/me", get(handlers::get_my_patient_record))
        .route("/{patient_id}", get(handlers::get_patient_record))
        .route("/{patient_id}/vitals", patch(handlers::update_vitals))
        .route(
            "/connections/doctors/{doctor_id}",
            get(handlers::list_doctor_connections),
        )
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
