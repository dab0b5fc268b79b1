use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn records_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/medications", post(handlers::prescribe_medication))
        .route(
            "/medications/patients/{patient_id}",
            get(handlers::get_patient_medications),
        )
        .route(
            "/medications/{medication_id}/discontinue",
            post(handlers::discontinue_medication),
        )
        .route("/reports", post(handlers::create_report))
        .route(
            "/reports/patients/{patient_id}",
            get(handlers::get_patient_reports),
        )
        .route("/reports/{report_id}", get(handlers::get_report))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
