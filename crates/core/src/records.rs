//! Flat domain records accepted by the engine.
//!
//! These are the shapes clients submit: one [`PatientRegistration`] per registration and a batch
//! of [`ExerciseRecord`]s per telemetry upload. Required text fields are typed
//! ([`NonEmptyText`], [`UserId`], [`EmailAddress`]) so malformed input is rejected while
//! deserialising, before any lookup or write happens.

use indexmap::IndexMap;
use physio_types::{EmailAddress, NonEmptyText, UserId};
use serde::{Deserialize, Serialize};

/// Demographics and assignment submitted when a patient is registered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRegistration {
    pub user_id: UserId,
    pub therapist_assigned: EmailAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub first_name: NonEmptyText,
    pub last_name: NonEmptyText,
    pub email: EmailAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(default, alias = "blood_grp", skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<String>,
    pub flag: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

/// Samples per muscle label, in upload order.
pub type MuscleSamples = IndexMap<String, Vec<f64>>;

/// One exercise session recorded by a device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    /// Must equal the user id of the subject the batch is uploaded for.
    pub user_id: UserId,
    /// Number of distinct muscles the device reported.
    pub total_muscles: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    pub date: String,
    /// Repetition label (`rep 1`, ...) to per-muscle samples.
    pub individual_reps: IndexMap<String, MuscleSamples>,
}

impl ExerciseRecord {
    /// Number of observations this record expands to.
    pub fn observation_count(&self) -> usize {
        self.individual_reps.values().map(IndexMap::len).sum()
    }

    /// Number of distinct muscle labels across all repetitions.
    pub fn distinct_muscles(&self) -> usize {
        let mut labels: Vec<&str> = self
            .individual_reps
            .values()
            .flat_map(|muscles| muscles.keys().map(String::as_str))
            .collect();
        labels.sort_unstable();
        labels.dedup();
        labels.len()
    }
}

/// Returns `value` trimmed, or `None` when it is absent or blank.
pub(crate) fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registration_accepts_blood_grp_alias() {
        let registration: PatientRegistration = serde_json::from_value(json!({
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
        }))
        .unwrap();

        assert_eq!(registration.user_id.as_str(), "12345");
        assert_eq!(registration.blood_group.as_deref(), Some("O+"));
        assert_eq!(registration.height, Some(176));
    }

    #[test]
    fn registration_rejects_blank_names_and_bad_email() {
        let blank_name = serde_json::from_value::<PatientRegistration>(json!({
            "user_id": "1", "therapist_assigned": "t@x.org", "first_name": "  ",
            "last_name": "Menon", "email": "a@x.org", "flag": 0
        }));
        assert!(blank_name.is_err());

        let bad_email = serde_json::from_value::<PatientRegistration>(json!({
            "user_id": "1", "therapist_assigned": "t@x.org", "first_name": "A",
            "last_name": "Menon", "email": "not-an-email", "flag": 0
        }));
        assert!(bad_email.is_err());
    }

    #[test]
    fn exercise_record_keeps_upload_order() {
        // Raw text, as axum's `Json` extractor and the CLI receive it.
        let record: ExerciseRecord = serde_json::from_str(
            r#"{
                "user_id": "12345",
                "total_muscles": 3,
                "device_name": "fsr 16bit 1",
                "date": "2025-07-10",
                "individual_reps": {
                    "rep 2": { "Right Biceps": [1.2], "Left Biceps": [1.1] },
                    "rep 1": { "Left Triceps": [1.0], "Left Biceps": [1.3] }
                }
            }"#,
        )
        .unwrap();

        let reps: Vec<&str> = record.individual_reps.keys().map(String::as_str).collect();
        assert_eq!(reps, vec!["rep 2", "rep 1"]);
        let muscles: Vec<&str> = record.individual_reps["rep 2"]
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(muscles, vec!["Right Biceps", "Left Biceps"]);

        assert_eq!(record.observation_count(), 4);
        assert_eq!(record.distinct_muscles(), 3);
    }

    #[test]
    fn present_drops_blank_values() {
        assert_eq!(present(Some(" O+ ")), Some("O+"));
        assert_eq!(present(Some("   ")), None);
        assert_eq!(present(None), None);
    }
}
