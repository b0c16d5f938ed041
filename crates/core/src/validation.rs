//! Input validation for telemetry uploads.
//!
//! Runs before any lookup-then-write sequence so rejected batches never touch the store.

use crate::records::ExerciseRecord;
use crate::{BundleError, BundleResult};
use physio_types::UserId;

/// Validates an upload batch for the subject identified by `subject_user_id`.
///
/// # Errors
///
/// Returns [`BundleError::InvalidInput`] if:
/// - the batch would produce no observations,
/// - a record's `user_id` differs from the subject's user id,
/// - a record has a blank date, repetition label or muscle label.
///
/// A record whose `total_muscles` disagrees with the muscles it actually carries is accepted
/// and logged.
pub fn validate_exercise_batch(
    subject_user_id: &UserId,
    records: &[ExerciseRecord],
) -> BundleResult<()> {
    if records.iter().map(ExerciseRecord::observation_count).sum::<usize>() == 0 {
        return Err(BundleError::InvalidInput(
            "exercise batch contains no observations".into(),
        ));
    }

    for (index, record) in records.iter().enumerate() {
        if record.user_id != *subject_user_id {
            return Err(BundleError::InvalidInput(format!(
                "record {index} has user_id '{}' but the patient's user id is '{}'",
                record.user_id, subject_user_id
            )));
        }

        if record.date.trim().is_empty() {
            return Err(BundleError::InvalidInput(format!(
                "record {index} has an empty date"
            )));
        }

        for (rep, muscles) in &record.individual_reps {
            if rep.trim().is_empty() {
                return Err(BundleError::InvalidInput(format!(
                    "record {index} has an empty repetition label"
                )));
            }
            if muscles.keys().any(|label| label.trim().is_empty()) {
                return Err(BundleError::InvalidInput(format!(
                    "record {index} '{rep}' has an empty muscle label"
                )));
            }
        }

        let distinct = record.distinct_muscles();
        if usize::try_from(record.total_muscles).ok() != Some(distinct) {
            tracing::warn!(
                record = index,
                user_id = %record.user_id,
                total_muscles = record.total_muscles,
                distinct_muscles = distinct,
                "total_muscles does not match the muscles in the record"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MuscleSamples;
    use indexmap::IndexMap;

    type Reps<'a> = Vec<(&'a str, Vec<(&'a str, Vec<f64>)>)>;

    fn record(user_id: &str, reps: Reps<'_>) -> ExerciseRecord {
        let individual_reps = reps
            .into_iter()
            .map(|(rep, muscles)| {
                let samples: MuscleSamples = muscles
                    .into_iter()
                    .map(|(label, values)| (label.to_string(), values))
                    .collect();
                (rep.to_string(), samples)
            })
            .collect::<IndexMap<_, _>>();
        ExerciseRecord {
            user_id: UserId::new(user_id).unwrap(),
            total_muscles: 1,
            device_name: None,
            date: "2025-07-10".into(),
            individual_reps,
        }
    }

    #[test]
    fn accepts_matching_batch() {
        let subject = UserId::new("12345").unwrap();
        let batch = vec![record("12345", vec![("rep 1", vec![("Left Biceps", vec![1.1, 1.3])])])];
        assert!(validate_exercise_batch(&subject, &batch).is_ok());
    }

    #[test]
    fn rejects_empty_batches() {
        let subject = UserId::new("12345").unwrap();
        assert!(matches!(
            validate_exercise_batch(&subject, &[]),
            Err(BundleError::InvalidInput(_))
        ));

        let no_reps = vec![record("12345", vec![])];
        assert!(validate_exercise_batch(&subject, &no_reps).is_err());
    }

    #[test]
    fn rejects_foreign_user_id() {
        let subject = UserId::new("12345").unwrap();
        let batch = vec![record("54321", vec![("rep 1", vec![("Left Biceps", vec![1.0])])])];
        match validate_exercise_batch(&subject, &batch) {
            Err(BundleError::InvalidInput(msg)) => assert!(msg.contains("54321"), "{msg}"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn rejects_blank_labels() {
        let subject = UserId::new("12345").unwrap();
        let blank_muscle = vec![record("12345", vec![("rep 1", vec![(" ", vec![1.0])])])];
        assert!(validate_exercise_batch(&subject, &blank_muscle).is_err());

        let mut blank_date = record("12345", vec![("rep 1", vec![("Left Biceps", vec![1.0])])]);
        blank_date.date = " ".into();
        assert!(validate_exercise_batch(&subject, &[blank_date]).is_err());
    }

    #[test]
    fn total_muscles_mismatch_is_not_fatal() {
        let subject = UserId::new("12345").unwrap();
        let mut mismatched = record(
            "12345",
            vec![(
                "rep 1",
                vec![("Left Biceps", vec![1.0]), ("Right Biceps", vec![1.2])],
            )],
        );
        mismatched.total_muscles = 5;
        assert!(validate_exercise_batch(&subject, &[mismatched]).is_ok());
    }
}
