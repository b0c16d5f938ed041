//! Request and response bodies.
//!
//! These mirror the core records with plain JSON types so they can carry OpenAPI schemas;
//! conversion into the typed core records is where field validation happens.

use indexmap::IndexMap;
use physio_core::{
    BundleError, BundleResult, EmailAddress, ExerciseRecord, NonEmptyText, PatientRegistration,
    UserId,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub detail: String,
}

/// Patient registration body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "user_id": "12345",
    "therapist_assigned": "therapist@gmail.com",
    "username": "APM",
    "first_name": "Anirudh",
    "last_name": "Menon",
    "email": "APM@gmail.com",
    "dob": "22-08-2024",
    "blood_grp": "O+",
    "flag": 1,
    "height": 176,
    "weight": 70,
    "gender": "male"
}))]
pub struct PatientDataReq {
    pub user_id: String,
    pub therapist_assigned: String,
    #[serde(default)]
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub blood_grp: Option<String>,
    pub flag: i64,
    #[serde(default)]
    pub height: Option<i64>,
    #[serde(default)]
    pub weight: Option<i64>,
    #[serde(default)]
    pub gender: Option<String>,
}

impl TryFrom<PatientDataReq> for PatientRegistration {
    type Error = BundleError;

    fn try_from(req: PatientDataReq) -> BundleResult<Self> {
        Ok(PatientRegistration {
            user_id: UserId::new(&req.user_id)?,
            therapist_assigned: EmailAddress::parse(&req.therapist_assigned)?,
            username: req.username,
            first_name: NonEmptyText::new(&req.first_name)?,
            last_name: NonEmptyText::new(&req.last_name)?,
            email: EmailAddress::parse(&req.email)?,
            dob: req.dob,
            blood_group: req.blood_grp,
            flag: req.flag,
            height: req.height,
            weight: req.weight,
            gender: req.gender,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientDataRes {
    pub message: String,
    /// Storage id of the new patient bundle.
    pub bundle_id: String,
    /// Id of the Patient resource inside the bundle.
    pub patient_id: String,
}

/// One exercise session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "user_id": "12345",
    "total_muscles": 3,
    "device_name": "fsr 16bit 1",
    "date": "2025-07-10",
    "individual_reps": {
        "rep 1": {
            "Left Biceps": [1.1, 1.3, 1.5],
            "Right Biceps": [1.2, 1.4, 1.6],
            "Left Triceps": [1.0, 1.2, 1.1]
        }
    }
}))]
pub struct ExerciseRecordReq {
    pub user_id: String,
    pub total_muscles: u32,
    #[serde(default)]
    pub device_name: Option<String>,
    pub date: String,
    /// Repetition label to muscle label to samples.
    #[schema(value_type = Object)]
    pub individual_reps: IndexMap<String, IndexMap<String, Vec<f64>>>,
}

impl TryFrom<ExerciseRecordReq> for ExerciseRecord {
    type Error = BundleError;

    fn try_from(req: ExerciseRecordReq) -> BundleResult<Self> {
        Ok(ExerciseRecord {
            user_id: UserId::new(&req.user_id)?,
            total_muscles: req.total_muscles,
            device_name: req.device_name,
            date: req.date,
            individual_reps: req.individual_reps,
        })
    }
}

/// Identifies the patient an upload belongs to.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadRes {
    pub message: String,
    pub user_id: String,
    /// True when this upload created the exercise bundle.
    pub created: bool,
    pub bundle_id: String,
}
