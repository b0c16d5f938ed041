//! The `collection` bundle envelope.
//!
//! A bundle is an ordered list of heterogeneous entries. Order is significant: the merge
//! algorithm only ever appends, so the position of an entry records when it arrived.
//!
//! Wire shape:
//!
//! ```json
//! {
//!   "resourceType": "Bundle",
//!   "type": "collection",
//!   "timestamp": "2025-07-10T09:30:00+00:00",
//!   "entry": [ { "resource": { "resourceType": "Patient", "...": "..." } } ]
//! }
//! ```

use crate::labels::MarkerLabel;
use crate::marker::{MarkerResource, MarkerValue};
use crate::observation::{
    decode_observation, exercise_to_wire, marker_to_wire, DecodedObservation, ExerciseObservation,
};
use crate::patient::IdentityResource;
use crate::{from_value_at, FhirError, FhirResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bundle type. Only `collection` bundles are produced or accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BundleType {
    Collection,
}

impl BundleType {
    fn to_wire(self) -> &'static str {
        match self {
            BundleType::Collection => "collection",
        }
    }

    fn from_wire(s: &str) -> Option<Self> {
        match s {
            "collection" => Some(BundleType::Collection),
            _ => None,
        }
    }
}

/// One bundle entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Resource {
    Identity(IdentityResource),
    Marker(MarkerResource),
    Exercise(ExerciseObservation),
}

impl Resource {
    pub fn as_identity(&self) -> Option<&IdentityResource> {
        match self {
            Resource::Identity(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn as_marker(&self) -> Option<&MarkerResource> {
        match self {
            Resource::Marker(marker) => Some(marker),
            _ => None,
        }
    }

    pub fn as_exercise(&self) -> Option<&ExerciseObservation> {
        match self {
            Resource::Exercise(observation) => Some(observation),
            _ => None,
        }
    }

    /// Renders this entry's `resource` object.
    pub fn to_json_value(&self) -> FhirResult<serde_json::Value> {
        let value = match self {
            Resource::Identity(identity) => serde_json::to_value(identity.to_wire())?,
            Resource::Marker(marker) => serde_json::to_value(marker_to_wire(marker))?,
            Resource::Exercise(observation) => serde_json::to_value(exercise_to_wire(observation))?,
        };
        Ok(value)
    }

    /// Decodes a `resource` object located at `context` inside a document.
    pub fn from_json_value(value: serde_json::Value, context: &str) -> FhirResult<Self> {
        let resource_type = value
            .get("resourceType")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| {
                FhirError::Translation(format!("missing resourceType at {context}"))
            })?;

        match resource_type.as_str() {
            "Patient" => IdentityResource::from_json_value(value, context).map(Resource::Identity),
            "Observation" => match decode_observation(value, context)? {
                DecodedObservation::Marker(marker) => Ok(Resource::Marker(marker)),
                DecodedObservation::Exercise(observation) => Ok(Resource::Exercise(observation)),
            },
            other => Err(FhirError::InvalidInput(format!(
                "unsupported resourceType '{other}' at {context}"
            ))),
        }
    }
}

impl From<IdentityResource> for Resource {
    fn from(value: IdentityResource) -> Self {
        Resource::Identity(value)
    }
}

impl From<MarkerResource> for Resource {
    fn from(value: MarkerResource) -> Self {
        Resource::Marker(value)
    }
}

impl From<ExerciseObservation> for Resource {
    fn from(value: ExerciseObservation) -> Self {
        Resource::Exercise(value)
    }
}

/// A bundle document.
#[derive(Clone, Debug, PartialEq)]
pub struct Bundle {
    pub bundle_type: BundleType,

    /// When the bundle was assembled. Appends do not change it.
    pub timestamp: Option<DateTime<Utc>>,

    pub entries: Vec<Resource>,
}

impl Bundle {
    /// Assembles a `collection` bundle stamped with the current time.
    pub fn collection(entries: Vec<Resource>) -> Self {
        Self {
            bundle_type: BundleType::Collection,
            timestamp: Some(Utc::now()),
            entries,
        }
    }

    /// The identity resource, if the bundle has one.
    pub fn identity(&self) -> Option<&IdentityResource> {
        self.entries.iter().find_map(Resource::as_identity)
    }

    pub fn markers(&self) -> impl Iterator<Item = &MarkerResource> {
        self.entries.iter().filter_map(Resource::as_marker)
    }

    /// Value of the first marker with `label`.
    pub fn marker_value(&self, label: MarkerLabel) -> Option<&MarkerValue> {
        self.markers()
            .find(|marker| marker.label == label)
            .map(|marker| &marker.value)
    }

    pub fn observations(&self) -> impl Iterator<Item = &ExerciseObservation> {
        self.entries.iter().filter_map(Resource::as_exercise)
    }

    /// Renders the bundle as a JSON value.
    pub fn to_json_value(&self) -> FhirResult<serde_json::Value> {
        let entry = self
            .entries
            .iter()
            .map(|resource| {
                Ok(EntryWire {
                    resource: resource.to_json_value()?,
                })
            })
            .collect::<FhirResult<Vec<_>>>()?;

        let wire = BundleWire {
            resource_type: "Bundle".to_string(),
            bundle_type: self.bundle_type.to_wire().to_string(),
            timestamp: self.timestamp.map(|ts| ts.to_rfc3339()),
            entry,
        };
        Ok(serde_json::to_value(wire)?)
    }

    /// Decodes a bundle from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - the envelope or any entry does not match the wire schema (unknown keys included),
    /// - `resourceType` is not `Bundle` or `type` is not `collection`,
    /// - an entry holds an unsupported resource, an unknown marker label or malformed samples.
    pub fn from_json_value(value: serde_json::Value) -> FhirResult<Self> {
        let wire: BundleWire = from_value_at(value, "Bundle", "")?;

        if wire.resource_type != "Bundle" {
            return Err(FhirError::InvalidInput(format!(
                "Expected resourceType 'Bundle', got '{}'",
                wire.resource_type
            )));
        }

        let bundle_type = BundleType::from_wire(&wire.bundle_type).ok_or_else(|| {
            FhirError::InvalidInput(format!(
                "Expected bundle type 'collection', got '{}'",
                wire.bundle_type
            ))
        })?;

        let timestamp = wire
            .timestamp
            .map(|ts| {
                ts.parse::<DateTime<Utc>>().map_err(|e| {
                    FhirError::Translation(format!("invalid bundle timestamp '{ts}': {e}"))
                })
            })
            .transpose()?;

        let entries = wire
            .entry
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                Resource::from_json_value(entry.resource, &format!("entry.{index}.resource"))
            })
            .collect::<FhirResult<Vec<_>>>()?;

        Ok(Self {
            bundle_type,
            timestamp,
            entries,
        })
    }

    /// Parses bundle JSON text.
    pub fn parse(json_text: &str) -> FhirResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json_text)?;
        Self::from_json_value(value)
    }

    /// Renders the bundle as pretty-printed JSON text.
    pub fn render(&self) -> FhirResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_json_value()?)?)
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct BundleWire {
    #[serde(rename = "resourceType")]
    resource_type: String,

    #[serde(rename = "type")]
    bundle_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,

    #[serde(default)]
    entry: Vec<EntryWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct EntryWire {
    resource: serde_json::Value,
}
