//! Exercise bundle builder.
//!
//! Every `(repetition, muscle)` pair of every record becomes one exercise observation, in upload
//! order. A full bundle is prefixed with the `User Id` marker and the `Patient Id`
//! back-reference; an observation-only bundle is what gets appended to an existing one.

use crate::records::{present, ExerciseRecord};
use crate::subject::SubjectLink;
use fhir::{encode_marker, Bundle, ExerciseObservation, MarkerLabel, Resource};

/// Expands `records` into exercise observations, in upload order.
pub fn exercise_observations(records: &[ExerciseRecord]) -> Vec<Resource> {
    let mut observations = Vec::new();
    for record in records {
        let device = present(record.device_name.as_deref()).map(str::to_owned);
        for (repetition, muscles) in &record.individual_reps {
            for (label, values) in muscles {
                observations.push(Resource::Exercise(ExerciseObservation {
                    label: label.clone(),
                    repetition: Some(repetition.clone()),
                    date: record.date.clone(),
                    device: device.clone(),
                    values: values.clone(),
                }));
            }
        }
    }
    observations
}

pub fn build_exercise_bundle(
    link: &SubjectLink,
    records: &[ExerciseRecord],
    include_identity_back_reference: bool,
) -> Bundle {
    let mut entries = Vec::new();
    if include_identity_back_reference {
        entries.push(encode_marker(MarkerLabel::UserId, link.user_id()).into());
        entries.push(encode_marker(MarkerLabel::PatientId, link.identity_id()).into());
    }
    entries.extend(exercise_observations(records));
    Bundle::collection(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhir::{MarkerValue, ShardableUuid};
    use indexmap::IndexMap;
    use physio_types::UserId;

    fn link() -> SubjectLink {
        SubjectLink::new(
            UserId::new("12345").unwrap(),
            ShardableUuid::parse("90a8d1ea318041d9adb070a834d4e0f6").unwrap(),
        )
    }

    fn record(date: &str, muscles: Vec<(&str, Vec<f64>)>) -> ExerciseRecord {
        let samples = muscles
            .into_iter()
            .map(|(label, values)| (label.to_string(), values))
            .collect();
        let mut individual_reps = IndexMap::new();
        individual_reps.insert("rep 1".to_string(), samples);
        ExerciseRecord {
            user_id: UserId::new("12345").unwrap(),
            total_muscles: 1,
            device_name: Some("fsr 16bit 1".into()),
            date: date.into(),
            individual_reps,
        }
    }

    #[test]
    fn full_bundle_starts_with_join_markers() {
        let records = vec![record("2025-07-10", vec![("Left Biceps", vec![1.1, 1.3])])];
        let bundle = build_exercise_bundle(&link(), &records, true);

        assert_eq!(bundle.entries.len(), 3);
        let markers: Vec<_> = bundle.markers().collect();
        assert_eq!(markers[0].label, MarkerLabel::UserId);
        assert_eq!(markers[0].value, MarkerValue::Text("12345".into()));
        assert_eq!(markers[1].label, MarkerLabel::PatientId);
        assert_eq!(
            markers[1].value,
            MarkerValue::Text("90a8d1ea318041d9adb070a834d4e0f6".into())
        );

        let observation = bundle.entries[2].as_exercise().unwrap();
        assert_eq!(observation.label, "Left Biceps");
        assert_eq!(observation.date, "2025-07-10");
        assert_eq!(observation.repetition.as_deref(), Some("rep 1"));
        assert_eq!(observation.device.as_deref(), Some("fsr 16bit 1"));
        assert_eq!(observation.values, vec![1.1, 1.3]);
    }

    #[test]
    fn observation_only_bundle_has_no_markers() {
        let records = vec![record("2025-07-11", vec![("Left Biceps", vec![2.0])])];
        let bundle = build_exercise_bundle(&link(), &records, false);
        assert_eq!(bundle.markers().count(), 0);
        assert_eq!(bundle.observations().count(), 1);
    }

    #[test]
    fn one_observation_per_muscle_in_upload_order() {
        let records = vec![
            record(
                "2025-07-10",
                vec![
                    ("Right Biceps", vec![1.2]),
                    ("Left Biceps", vec![1.1]),
                    ("Left Triceps", vec![1.0]),
                ],
            ),
            record("2025-07-11", vec![("Left Biceps", vec![2.0])]),
        ];
        let observations = exercise_observations(&records);
        let summary: Vec<(&str, &str)> = observations
            .iter()
            .filter_map(Resource::as_exercise)
            .map(|o| (o.label.as_str(), o.date.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Right Biceps", "2025-07-10"),
                ("Left Biceps", "2025-07-10"),
                ("Left Triceps", "2025-07-10"),
                ("Left Biceps", "2025-07-11"),
            ]
        );
    }

    #[test]
    fn building_is_deterministic_apart_from_timestamp() {
        let records = vec![record("2025-07-10", vec![("Left Biceps", vec![1.1, 1.3])])];
        let first = build_exercise_bundle(&link(), &records, true);
        let second = build_exercise_bundle(&link(), &records, true);
        assert_eq!(first.entries, second.entries);
    }
}
