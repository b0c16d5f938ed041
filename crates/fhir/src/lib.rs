//! FHIR-aligned wire support for physio bundles.
//!
//! This crate provides **domain types** and **wire models** for the bundle documents the engine
//! persists:
//! - the Patient (identity) resource,
//! - marker observations (a controlled-vocabulary label plus a string or integer value),
//! - exercise observations (per-muscle repetition samples),
//! - the `collection` bundle envelope holding an ordered list of the above.
//!
//! This crate focuses on:
//! - FHIR semantic alignment of the JSON documents (without FHIR REST semantics)
//! - strict serialisation/deserialisation with field paths in error messages
//! - the resource encoder ([`encode_marker`]) and the label vocabulary ([`MarkerLabel`])
//!
//! Storage, querying and merging live in `physio-core`.

pub mod bundle;
pub mod labels;
pub mod marker;
pub mod observation;
pub mod patient;

pub use bundle::{Bundle, BundleType, Resource};
pub use labels::MarkerLabel;
pub use marker::{encode_marker, MarkerResource, MarkerValue};
pub use observation::ExerciseObservation;
pub use patient::{IdentityResource, NameUse};

// Re-export the identifier type embedded in identity resources.
pub use physio_uuid::ShardableUuid;

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("invalid UUID: {0}")]
    InvalidUuid(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;

/// Deserialises `value` into `T`, reporting the failing field path relative to `context`.
///
/// `context` is the location of `value` inside the enclosing document (for example
/// `entry.2.resource`) so that errors read `Observation schema mismatch at entry.2.resource.code`.
pub(crate) fn from_value_at<T>(
    value: serde_json::Value,
    kind: &str,
    context: &str,
) -> FhirResult<T>
where
    T: serde::de::DeserializeOwned,
{
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let path = err.path().to_string();
        let source = err.into_inner();
        let location = match (context.is_empty(), path.is_empty() || path == ".") {
            (true, true) => "<root>".to_string(),
            (true, false) => path,
            (false, true) => context.to_string(),
            (false, false) => format!("{context}.{path}"),
        };
        FhirError::Translation(format!("{kind} schema mismatch at {location}: {source}"))
    })
}
