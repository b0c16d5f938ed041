//! FHIR-aligned Patient (identity) resource and its wire model.
//!
//! Responsibilities:
//! - Define the flat domain-level [`IdentityResource`] used by the builders and queries
//! - Define a strict wire model for serialisation/deserialisation
//! - Translate between the two
//!
//! Notes:
//! - Exactly one identity resource appears in a patient bundle
//! - Its `id` is allocated at registration and never rewritten; exercise bundles point at it

use crate::{from_value_at, FhirError, FhirResult};
use physio_uuid::ShardableUuid;
use serde::{Deserialize, Serialize};

// ============================================================================
// Public domain-level types
// ============================================================================

/// Purpose of a human name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameUse {
    /// Official name.
    Official,
    /// Usual/preferred name.
    Usual,
    /// Temporary name.
    Temp,
    /// Nickname or informal name.
    Nickname,
    /// Anonymous name.
    Anonymous,
    /// Old name (no longer in use).
    Old,
    /// Maiden name.
    Maiden,
}

impl NameUse {
    /// Convert to FHIR wire format string.
    fn to_wire(self) -> &'static str {
        match self {
            NameUse::Official => "official",
            NameUse::Usual => "usual",
            NameUse::Temp => "temp",
            NameUse::Nickname => "nickname",
            NameUse::Anonymous => "anonymous",
            NameUse::Old => "old",
            NameUse::Maiden => "maiden",
        }
    }

    /// Parse from FHIR wire format string.
    fn from_wire(s: &str) -> Option<Self> {
        match s {
            "official" => Some(NameUse::Official),
            "usual" => Some(NameUse::Usual),
            "temp" => Some(NameUse::Temp),
            "nickname" => Some(NameUse::Nickname),
            "anonymous" => Some(NameUse::Anonymous),
            "old" => Some(NameUse::Old),
            "maiden" => Some(NameUse::Maiden),
            _ => None,
        }
    }
}

/// Domain-level carrier for the identity resource (flat structure).
///
/// The wire format supports multiple names; this flat structure keeps the first (primary) one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityResource {
    /// Identity id; the back-reference target of exercise bundles.
    pub id: ShardableUuid,

    /// Purpose of the name (official, usual, nickname, etc.).
    pub use_type: Option<NameUse>,

    /// Family name (surname).
    pub family: Option<String>,

    /// Given names (first name, middle names).
    pub given: Vec<String>,

    /// Date of birth exactly as supplied at registration.
    pub birth_date: Option<String>,

    /// Administrative gender exactly as supplied at registration.
    pub gender: Option<String>,
}

impl IdentityResource {
    /// The first given name, used when re-identifying a patient by name.
    pub fn first_given(&self) -> Option<&str> {
        self.given.first().map(String::as_str)
    }

    pub(crate) fn to_wire(&self) -> PatientWire {
        let names = if self.use_type.is_some() || self.family.is_some() || !self.given.is_empty() {
            vec![FullNameWire {
                use_type: self.use_type.map(|u| u.to_wire().to_string()),
                family: self.family.clone(),
                given: self.given.clone(),
            }]
        } else {
            vec![]
        };

        PatientWire {
            resource_type: "Patient".to_string(),
            id: self.id.to_string(),
            name: names,
            gender: self.gender.clone(),
            birth_date: self.birth_date.clone(),
        }
    }

    /// Decodes a Patient resource located at `context` inside a document.
    pub(crate) fn from_json_value(value: serde_json::Value, context: &str) -> FhirResult<Self> {
        let wire: PatientWire = from_value_at(value, "Patient", context)?;

        if wire.resource_type != "Patient" {
            return Err(FhirError::InvalidInput(format!(
                "Expected resourceType 'Patient', got '{}'",
                wire.resource_type
            )));
        }

        let id = ShardableUuid::parse(&wire.id)
            .map_err(|e| FhirError::InvalidUuid(format!("{context}.id: {e}")))?;

        let mut names = wire.name.into_iter();
        let primary = names.next();

        Ok(IdentityResource {
            id,
            use_type: primary
                .as_ref()
                .and_then(|n| n.use_type.as_deref())
                .and_then(NameUse::from_wire),
            family: primary.as_ref().and_then(|n| n.family.clone()),
            given: primary.map(|n| n.given).unwrap_or_default(),
            birth_date: wire.birth_date,
            gender: wire.gender,
        })
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

/// Wire representation of a Patient resource.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct PatientWire {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    pub id: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<FullNameWire>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(rename = "birthDate", default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
}

/// Wire representation of a human name.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct FullNameWire {
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> IdentityResource {
        IdentityResource {
            id: ShardableUuid::parse("90a8d1ea318041d9adb070a834d4e0f6").expect("valid uuid"),
            use_type: Some(NameUse::Official),
            family: Some("Menon".to_string()),
            given: vec!["Anirudh".to_string()],
            birth_date: Some("22-08-2024".to_string()),
            gender: Some("male".to_string()),
        }
    }

    #[test]
    fn round_trips_through_wire() {
        let identity = sample();
        let value = serde_json::to_value(identity.to_wire()).unwrap();
        let back = IdentityResource::from_json_value(value, "resource").unwrap();
        assert_eq!(identity, back);
    }

    #[test]
    fn renders_fhir_field_names() {
        let value = serde_json::to_value(sample().to_wire()).unwrap();
        assert_eq!(value["resourceType"], "Patient");
        assert_eq!(value["name"][0]["use"], "official");
        assert_eq!(value["name"][0]["given"][0], "Anirudh");
        assert_eq!(value["name"][0]["family"], "Menon");
        assert_eq!(value["birthDate"], "22-08-2024");
        assert_eq!(value["gender"], "male");
    }

    #[test]
    fn minimal_patient_omits_optional_fields() {
        let identity = IdentityResource {
            id: ShardableUuid::parse("00000000000000000000000000000001").unwrap(),
            use_type: None,
            family: None,
            given: vec![],
            birth_date: None,
            gender: None,
        };
        let value = serde_json::to_value(identity.to_wire()).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("name"));
        assert!(!object.contains_key("birthDate"));
        assert!(!object.contains_key("gender"));
    }

    #[test]
    fn strict_validation_rejects_unknown_keys() {
        let value = json!({
            "resourceType": "Patient",
            "id": "90a8d1ea318041d9adb070a834d4e0f6",
            "unexpected_key": true
        });
        match IdentityResource::from_json_value(value, "entry.0.resource") {
            Err(FhirError::Translation(msg)) => {
                assert!(msg.contains("unexpected_key"));
                assert!(msg.contains("entry.0.resource"));
            }
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn strict_validation_reports_field_path() {
        let value = json!({
            "resourceType": "Patient",
            "id": "90a8d1ea318041d9adb070a834d4e0f6",
            "name": [{ "given": "not_an_array" }]
        });
        match IdentityResource::from_json_value(value, "entry.0.resource") {
            Err(FhirError::Translation(msg)) => {
                assert!(msg.starts_with("Patient schema mismatch at entry.0.resource.name"), "{msg}");
                assert!(msg.contains("given"), "{msg}");
            }
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_canonical_id() {
        let value = json!({
            "resourceType": "Patient",
            "id": "90a8d1ea-3180-41d9-adb0-70a834d4e0f6"
        });
        assert!(matches!(
            IdentityResource::from_json_value(value, "resource"),
            Err(FhirError::InvalidUuid(_))
        ));
    }

    #[test]
    fn keeps_only_primary_name() {
        let value = json!({
            "resourceType": "Patient",
            "id": "90a8d1ea318041d9adb070a834d4e0f6",
            "name": [
                { "use": "official", "family": "Williams", "given": ["Sarah", "Jane"] },
                { "use": "nickname", "given": ["Sally"] }
            ]
        });
        let identity = IdentityResource::from_json_value(value, "resource").unwrap();
        assert_eq!(identity.use_type, Some(NameUse::Official));
        assert_eq!(identity.family.as_deref(), Some("Williams"));
        assert_eq!(identity.first_given(), Some("Sarah"));
    }
}
