//! The typed join between a patient bundle and its exercise bundle.

use crate::{BundleError, BundleResult};
use fhir::{Bundle, MarkerLabel, ShardableUuid};
use physio_types::UserId;

/// A subject's user id paired with the id of its identity resource.
///
/// Only constructed by the patient bundle builder or read back from a stored patient bundle, so
/// every exercise bundle built from a link carries the same join key as the patient bundle it
/// belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectLink {
    user_id: UserId,
    identity_id: ShardableUuid,
}

impl SubjectLink {
    pub(crate) fn new(user_id: UserId, identity_id: ShardableUuid) -> Self {
        Self {
            user_id,
            identity_id,
        }
    }

    /// Reads the link from a patient bundle.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::InvariantViolation`] if the bundle has no identity resource or no
    /// usable `User Id` marker.
    pub fn from_patient_bundle(bundle: &Bundle) -> BundleResult<Self> {
        let identity = bundle.identity().ok_or_else(|| {
            BundleError::InvariantViolation("patient bundle has no Patient resource".into())
        })?;

        let user_id = bundle
            .marker_value(MarkerLabel::UserId)
            .and_then(|value| value.as_text())
            .ok_or_else(|| {
                BundleError::InvariantViolation("patient bundle has no User Id marker".into())
            })?;

        let user_id = UserId::new(user_id).map_err(|e| {
            BundleError::InvariantViolation(format!("patient bundle User Id marker: {e}"))
        })?;

        Ok(Self::new(user_id, identity.id.clone()))
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn identity_id(&self) -> &ShardableUuid {
        &self.identity_id
    }
}
