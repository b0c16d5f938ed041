//! # API REST
//!
//! REST API for the physio bundle engine.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI documentation (served as JSON at `/api-docs/openapi.json`)
//! - REST-specific concerns (JSON bodies, status codes, CORS)
//!
//! All bundle logic lives in `physio-core`; handlers only translate requests and errors.

#![warn(rust_2018_idioms)]

mod error;
mod handlers;
pub mod models;

pub use error::{ApiError, ApiResult};

use axum::routing::{get, post};
use axum::{Json, Router};
use physio_core::BundleService;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BundleService>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::post_patient_data,
        handlers::upload_exercise,
        handlers::export_for_clinician,
        handlers::export_patient,
        handlers::get_exercise_bundles,
    ),
    components(schemas(
        models::HealthRes,
        models::ErrorRes,
        models::PatientDataReq,
        models::PatientDataRes,
        models::ExerciseRecordReq,
        models::UploadRes,
    ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Builds the REST router over `service`.
pub fn router(service: Arc<BundleService>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/patient-data", post(handlers::post_patient_data))
        .route("/upload-exercise", post(handlers::upload_exercise))
        // Existing device clients post with a trailing slash.
        .route("/upload-exercise/", post(handlers::upload_exercise))
        .route("/fhir/export/:therapist_email", get(handlers::export_for_clinician))
        .route("/fhir/export/patient/:email", get(handlers::export_patient))
        .route("/get-exercise-bundles/:user_id", get(handlers::get_exercise_bundles))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(CorsLayer::permissive())
        .with_state(AppState { service })
}
