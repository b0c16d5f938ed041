//! Observation wire model shared by marker and exercise observations.
//!
//! Both kinds of entry are FHIR `Observation` resources; they are told apart by their value:
//! - `valueString` / `valueInteger` → a marker (the `code.text` must be a vocabulary label)
//! - `valueSampledData` → an exercise observation (the `code.text` is a muscle label)
//!
//! Exercise samples are encoded as a space-separated `data` string, following FHIR
//! `SampledData`. Each value is written with Rust's shortest round-trip float formatting, so
//! decoding yields the exact `f64` values that were encoded.

use crate::labels::MarkerLabel;
use crate::marker::{MarkerResource, MarkerValue};
use crate::{from_value_at, FhirError, FhirResult};
use serde::{Deserialize, Serialize};

const OBSERVATION_STATUS: &str = "final";

/// One muscle's repetition samples from one exercise session.
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseObservation {
    /// Muscle label, for example `Left Biceps`.
    pub label: String,

    /// Repetition label from the upload, for example `rep 1`.
    pub repetition: Option<String>,

    /// Session date exactly as supplied by the device.
    pub date: String,

    /// Name of the recording device, when known.
    pub device: Option<String>,

    /// Samples, in recording order.
    pub values: Vec<f64>,
}

/// Decoded observation: either a marker or an exercise observation.
pub(crate) enum DecodedObservation {
    Marker(MarkerResource),
    Exercise(ExerciseObservation),
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct ObservationWire {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    pub code: CodeableConceptWire,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<CodeableConceptWire>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceReferenceWire>,

    #[serde(
        rename = "effectiveDateTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub effective_date_time: Option<String>,

    #[serde(rename = "valueString", default, skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,

    #[serde(rename = "valueInteger", default, skip_serializing_if = "Option::is_none")]
    pub value_integer: Option<i64>,

    #[serde(
        rename = "valueSampledData",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub value_sampled_data: Option<SampledDataWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct CodeableConceptWire {
    pub text: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct DeviceReferenceWire {
    pub display: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct SampledDataWire {
    pub origin: QuantityWire,
    pub dimensions: u32,
    pub data: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct QuantityWire {
    pub value: f64,
}

// ============================================================================
// Translation helpers (internal)
// ============================================================================

fn empty_observation(code: &str) -> ObservationWire {
    ObservationWire {
        resource_type: "Observation".to_string(),
        status: Some(OBSERVATION_STATUS.to_string()),
        code: CodeableConceptWire {
            text: code.to_string(),
        },
        method: None,
        device: None,
        effective_date_time: None,
        value_string: None,
        value_integer: None,
        value_sampled_data: None,
    }
}

pub(crate) fn marker_to_wire(marker: &MarkerResource) -> ObservationWire {
    let mut wire = empty_observation(marker.label.as_text());
    match &marker.value {
        MarkerValue::Text(text) => wire.value_string = Some(text.clone()),
        MarkerValue::Integer(value) => wire.value_integer = Some(*value),
    }
    wire
}

pub(crate) fn exercise_to_wire(observation: &ExerciseObservation) -> ObservationWire {
    let mut wire = empty_observation(&observation.label);
    wire.method = observation
        .repetition
        .as_ref()
        .map(|rep| CodeableConceptWire { text: rep.clone() });
    wire.device = observation
        .device
        .as_ref()
        .map(|name| DeviceReferenceWire {
            display: name.clone(),
        });
    wire.effective_date_time = Some(observation.date.clone());
    wire.value_sampled_data = Some(SampledDataWire {
        origin: QuantityWire { value: 0.0 },
        dimensions: 1,
        data: encode_samples(&observation.values),
    });
    wire
}

fn encode_samples(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_samples(data: &str, context: &str) -> FhirResult<Vec<f64>> {
    data.split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|e| {
                FhirError::Translation(format!(
                    "invalid sample '{token}' at {context}.valueSampledData.data: {e}"
                ))
            })
        })
        .collect()
}

/// Decodes an Observation located at `context` inside a document.
pub(crate) fn decode_observation(
    value: serde_json::Value,
    context: &str,
) -> FhirResult<DecodedObservation> {
    let wire: ObservationWire = from_value_at(value, "Observation", context)?;

    match (wire.value_string, wire.value_integer, wire.value_sampled_data) {
        (Some(text), None, None) => marker_from_parts(&wire.code.text, MarkerValue::Text(text), context),
        (None, Some(integer), None) => {
            marker_from_parts(&wire.code.text, MarkerValue::Integer(integer), context)
        }
        (None, None, Some(sampled)) => {
            let date = wire.effective_date_time.ok_or_else(|| {
                FhirError::Translation(format!(
                    "exercise observation at {context} has no effectiveDateTime"
                ))
            })?;
            Ok(DecodedObservation::Exercise(ExerciseObservation {
                label: wire.code.text,
                repetition: wire.method.map(|m| m.text),
                date,
                device: wire.device.map(|d| d.display),
                values: decode_samples(&sampled.data, context)?,
            }))
        }
        _ => Err(FhirError::Translation(format!(
            "observation at {context} must carry exactly one of valueString, valueInteger or valueSampledData"
        ))),
    }
}

fn marker_from_parts(
    code: &str,
    value: MarkerValue,
    context: &str,
) -> FhirResult<DecodedObservation> {
    let label = MarkerLabel::from_text(code).ok_or_else(|| {
        FhirError::Translation(format!("unknown marker label '{code}' at {context}.code.text"))
    })?;
    Ok(DecodedObservation::Marker(MarkerResource { label, value }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn biceps() -> ExerciseObservation {
        ExerciseObservation {
            label: "Left Biceps".to_string(),
            repetition: Some("rep 1".to_string()),
            date: "2025-07-10".to_string(),
            device: Some("fsr 16bit 1".to_string()),
            values: vec![1.1, 1.3, 2.0],
        }
    }

    #[test]
    fn exercise_wire_shape() {
        let value = serde_json::to_value(exercise_to_wire(&biceps())).unwrap();
        assert_eq!(value["resourceType"], "Observation");
        assert_eq!(value["status"], "final");
        assert_eq!(value["code"]["text"], "Left Biceps");
        assert_eq!(value["method"]["text"], "rep 1");
        assert_eq!(value["device"]["display"], "fsr 16bit 1");
        assert_eq!(value["effectiveDateTime"], "2025-07-10");
        assert_eq!(value["valueSampledData"]["data"], "1.1 1.3 2");
        assert_eq!(value["valueSampledData"]["dimensions"], 1);
    }

    #[test]
    fn samples_decode_to_identical_floats() {
        let original = biceps();
        let value = serde_json::to_value(exercise_to_wire(&original)).unwrap();
        match decode_observation(value, "resource").unwrap() {
            DecodedObservation::Exercise(decoded) => assert_eq!(decoded, original),
            DecodedObservation::Marker(_) => panic!("expected exercise observation"),
        }
    }

    #[test]
    fn marker_wire_shape() {
        let marker = MarkerResource {
            label: MarkerLabel::Email,
            value: MarkerValue::Text("APM@gmail.com".into()),
        };
        let value = serde_json::to_value(marker_to_wire(&marker)).unwrap();
        assert_eq!(value["code"]["text"], "Email");
        assert_eq!(value["valueString"], "APM@gmail.com");
        assert!(value.get("valueInteger").is_none());

        let height = MarkerResource {
            label: MarkerLabel::Height,
            value: MarkerValue::Integer(176),
        };
        let value = serde_json::to_value(marker_to_wire(&height)).unwrap();
        assert_eq!(value["valueInteger"], 176);
    }

    #[test]
    fn rejects_unknown_marker_label() {
        let value = json!({
            "resourceType": "Observation",
            "code": { "text": "Favourite Colour" },
            "valueString": "blue"
        });
        match decode_observation(value, "entry.3.resource") {
            Err(FhirError::Translation(msg)) => {
                assert!(msg.contains("Favourite Colour"));
                assert!(msg.contains("entry.3.resource"));
            }
            _ => panic!("expected Translation error"),
        }
    }

    #[test]
    fn rejects_ambiguous_value() {
        let value = json!({
            "resourceType": "Observation",
            "code": { "text": "Email" },
            "valueString": "a@b.c",
            "valueInteger": 1
        });
        assert!(decode_observation(value, "resource").is_err());
    }

    #[test]
    fn rejects_malformed_samples() {
        let value = json!({
            "resourceType": "Observation",
            "code": { "text": "Left Biceps" },
            "effectiveDateTime": "2025-07-10",
            "valueSampledData": { "origin": { "value": 0.0 }, "dimensions": 1, "data": "1.1 abc" }
        });
        match decode_observation(value, "resource") {
            Err(FhirError::Translation(msg)) => assert!(msg.contains("abc")),
            _ => panic!("expected Translation error"),
        }
    }
}
