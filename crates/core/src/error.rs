//! Error taxonomy of the bundle engine.
//!
//! Every failure carries enough context (collection, label, value) for a caller to render a
//! precise message. [`BundleError::kind`] collapses the variants onto the categories callers
//! branch on.

use crate::store::{Collection, StoreError};
use fhir::MarkerLabel;
use physio_types::TextError;

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("no {collection} bundle matches {query}")]
    NotFound { collection: Collection, query: String },

    #[error("a {collection} bundle with {label} '{value}' already exists")]
    Conflict {
        collection: Collection,
        label: MarkerLabel,
        value: String,
    },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("FHIR translation failed: {0}")]
    Fhir(#[from] fhir::FhirError),
}

/// Category of a [`BundleError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvariantViolation,
    InvalidInput,
    StorageFailure,
}

impl BundleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BundleError::NotFound { .. } => ErrorKind::NotFound,
            BundleError::Conflict { .. } => ErrorKind::Conflict,
            BundleError::InvariantViolation(_) => ErrorKind::InvariantViolation,
            BundleError::InvalidInput(_) => ErrorKind::InvalidInput,
            BundleError::Storage(_) => ErrorKind::StorageFailure,
            // Wire translation only fails on documents that were already malformed.
            BundleError::Fhir(_) => ErrorKind::InvariantViolation,
        }
    }
}

impl From<TextError> for BundleError {
    fn from(err: TextError) -> Self {
        BundleError::InvalidInput(err.to_string())
    }
}

pub type BundleResult<T> = std::result::Result<T, BundleError>;
