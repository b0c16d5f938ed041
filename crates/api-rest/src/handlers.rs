//! Route handlers.
//!
//! Core operations are synchronous and may block on file IO or a subject lock, so every handler
//! runs them through [`tokio::task::spawn_blocking`].

use crate::error::{ApiError, ApiResult};
use crate::models::{
    ExerciseRecordReq, HealthRes, PatientDataReq, PatientDataRes, UploadQuery, UploadRes,
};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use physio_core::constants::FHIR_JSON_MEDIA_TYPE;
use physio_core::{
    BundleError, BundleResult, BundleService, Collection, EmailAddress, ExerciseRecord,
    NonEmptyText, PatientRegistration, StoredBundle, UserId,
};
use std::sync::Arc;

async fn blocking<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&BundleService) -> BundleResult<T> + Send + 'static,
    T: Send + 'static,
{
    let service = Arc::clone(&state.service);
    tokio::task::spawn_blocking(move || f(service.as_ref()))
        .await
        .map_err(|e| ApiError::Task(e.to_string()))?
        .map_err(ApiError::from)
}

fn export_values(bundles: &[StoredBundle]) -> BundleResult<Vec<serde_json::Value>> {
    bundles
        .iter()
        .map(|stored| stored.to_json_value().map_err(BundleError::from))
        .collect()
}

fn fhir_json(value: serde_json::Value) -> Response {
    (
        [(header::CONTENT_TYPE, FHIR_JSON_MEDIA_TYPE)],
        Json(value),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint.
pub(crate) async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Physio REST API is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/patient-data",
    request_body = PatientDataReq,
    responses(
        (status = 201, description = "Patient bundle created", body = PatientDataRes),
        (status = 400, description = "Invalid registration", body = ErrorRes),
        (status = 409, description = "Email or user id already registered", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Register a patient and store their patient bundle.
pub(crate) async fn post_patient_data(
    State(state): State<AppState>,
    Json(req): Json<PatientDataReq>,
) -> ApiResult<(StatusCode, Json<PatientDataRes>)> {
    let registration = PatientRegistration::try_from(req)?;
    let registered = blocking(&state, move |service| {
        service.register_patient(registration)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(PatientDataRes {
            message: "Patient bundle created".into(),
            bundle_id: registered.document_id.to_string(),
            patient_id: registered.link.identity_id().to_string(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/upload-exercise",
    params(UploadQuery),
    request_body = Vec<ExerciseRecordReq>,
    responses(
        (status = 200, description = "Exercise data merged", body = UploadRes),
        (status = 400, description = "Invalid upload", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Merge an upload batch into the patient's exercise bundle.
///
/// The patient is identified by email plus first and last name. The first upload creates the
/// exercise bundle; later uploads append to it.
pub(crate) async fn upload_exercise(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    Json(records): Json<Vec<ExerciseRecordReq>>,
) -> ApiResult<Json<UploadRes>> {
    let email = EmailAddress::parse(&query.email)?;
    let first_name = NonEmptyText::new(&query.first_name)?;
    let last_name = NonEmptyText::new(&query.last_name)?;
    let records = records
        .into_iter()
        .map(ExerciseRecord::try_from)
        .collect::<BundleResult<Vec<_>>>()?;

    let outcome = blocking(&state, move |service| {
        service.upload_exercise_batch(&email, &first_name, &last_name, &records)
    })
    .await?;

    let message = if outcome.created {
        "New exercise bundle created"
    } else {
        "Exercise data added to existing exercise bundle"
    };

    Ok(Json(UploadRes {
        message: message.into(),
        user_id: outcome.user_id.to_string(),
        created: outcome.created,
        bundle_id: outcome.document_id.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/fhir/export/{therapist_email}",
    params(
        ("therapist_email" = String, Path, description = "Email of the assigned clinician")
    ),
    responses(
        (status = 200, description = "Patient bundles assigned to the clinician"),
        (status = 404, description = "No patients assigned", body = ErrorRes)
    )
)]
/// Export every patient bundle assigned to a clinician.
pub(crate) async fn export_for_clinician(
    State(state): State<AppState>,
    Path(therapist_email): Path<String>,
) -> ApiResult<Response> {
    let email = EmailAddress::parse(&therapist_email)?;
    let values = blocking(&state, move |service| {
        export_values(&service.export_bundles_for_clinician(&email)?)
    })
    .await?;
    Ok(fhir_json(serde_json::Value::Array(values)))
}

#[utoipa::path(
    get,
    path = "/fhir/export/patient/{email}",
    params(
        ("email" = String, Path, description = "Patient email")
    ),
    responses(
        (status = 200, description = "The patient bundle"),
        (status = 404, description = "No patient with that email", body = ErrorRes)
    )
)]
/// Export one patient's bundle.
pub(crate) async fn export_patient(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Response> {
    let email = EmailAddress::parse(&email)?;
    let value = blocking(&state, move |service| {
        let stored = service
            .export_patient_bundle(&email)?
            .ok_or_else(|| BundleError::NotFound {
                collection: Collection::Patients,
                query: format!("Email = '{email}'"),
            })?;
        Ok(stored.to_json_value()?)
    })
    .await?;
    Ok(fhir_json(value))
}

#[utoipa::path(
    get,
    path = "/get-exercise-bundles/{user_id}",
    params(
        ("user_id" = String, Path, description = "User id shared by the patient and exercise bundles")
    ),
    responses(
        (status = 200, description = "Exercise bundles for the user"),
        (status = 404, description = "No exercise bundles for the user", body = ErrorRes)
    )
)]
/// Export a user's exercise bundles.
pub(crate) async fn get_exercise_bundles(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Response> {
    let user_id = UserId::new(&user_id)?;
    let values = blocking(&state, move |service| {
        export_values(&service.export_exercise_bundles(&user_id)?)
    })
    .await?;
    Ok(fhir_json(serde_json::Value::Array(values)))
}
