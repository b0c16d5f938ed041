//! The operations exposed to callers.
//!
//! [`BundleService`] is what the REST and CLI surfaces hold. It owns the store handle, the
//! resolved configuration and the per-subject lock table, and runs every lookup-then-write
//! sequence inside the matching critical section:
//! - registrations are serialised per email, then per user id
//! - uploads are serialised per user id
//!
//! Exports are plain reads and take no locks.

use crate::config::CoreConfig;
use crate::locks::{email_key, user_key, SubjectLocks};
use crate::records::{ExerciseRecord, PatientRegistration};
use crate::repositories::{ExerciseBundles, PatientBundles, Registered, UploadOutcome};
use crate::store::{open_store, BundleStore, Collection, StoredBundle};
use crate::validation::validate_exercise_batch;
use crate::{BundleError, BundleResult};
use fhir::MarkerLabel;
use physio_types::{EmailAddress, NonEmptyText, UserId};
use std::sync::Arc;

pub struct BundleService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn BundleStore>,
    locks: SubjectLocks,
}

impl BundleService {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn BundleStore>) -> Self {
        Self {
            cfg,
            store,
            locks: SubjectLocks::new(),
        }
    }

    /// Opens the store selected by `cfg` and wraps it in a service.
    pub fn open(cfg: Arc<CoreConfig>) -> BundleResult<Self> {
        let store = open_store(&cfg)?;
        Ok(Self::new(cfg, store))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn store(&self) -> &dyn BundleStore {
        self.store.as_ref()
    }

    fn patients(&self) -> PatientBundles<'_> {
        PatientBundles::new(self.store.as_ref(), self.cfg.match_policy())
    }

    fn exercises(&self) -> ExerciseBundles<'_> {
        ExerciseBundles::new(self.store.as_ref(), self.cfg.match_policy())
    }

    /// Registers a patient, creating their patient bundle.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::Conflict`] if the email or user id is already registered.
    pub fn register_patient(&self, registration: PatientRegistration) -> BundleResult<Registered> {
        let email = self
            .cfg
            .match_policy()
            .normalize(registration.email.as_str())
            .into_owned();

        self.locks.with_lock(&email_key(&email), || {
            self.locks
                .with_lock(&user_key(registration.user_id.as_str()), || {
                    self.patients().register(&registration)
                })
        })
    }

    /// Appends an upload batch to the exercise bundle of the patient identified by email and
    /// name, creating the bundle on the first upload.
    ///
    /// # Errors
    ///
    /// - [`BundleError::NotFound`] if no patient matches email and name.
    /// - [`BundleError::InvariantViolation`] if the patient bundle is missing its identity or
    ///   `User Id` marker.
    /// - [`BundleError::InvalidInput`] if the batch is empty or a record names another user.
    ///
    /// No write happens on any of these.
    pub fn upload_exercise_batch(
        &self,
        email: &EmailAddress,
        first_name: &NonEmptyText,
        last_name: &NonEmptyText,
        records: &[ExerciseRecord],
    ) -> BundleResult<UploadOutcome> {
        let link = self
            .patients()
            .resolve_subject(email, first_name, last_name)?;
        validate_exercise_batch(link.user_id(), records)?;

        self.locks
            .with_lock(&user_key(link.user_id().as_str()), || {
                self.exercises().merge(&link, records)
            })
    }

    /// Every patient bundle assigned to `clinician_email`.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::NotFound`] when the clinician has no patients.
    pub fn export_bundles_for_clinician(
        &self,
        clinician_email: &EmailAddress,
    ) -> BundleResult<Vec<StoredBundle>> {
        let bundles = self.patients().find_for_clinician(clinician_email)?;
        if bundles.is_empty() {
            return Err(BundleError::NotFound {
                collection: Collection::Patients,
                query: format!("{} = '{clinician_email}'", MarkerLabel::TherapistAssigned),
            });
        }
        tracing::debug!(%clinician_email, count = bundles.len(), "exported clinician bundles");
        Ok(bundles)
    }

    /// The patient bundle registered with `email`, if any.
    pub fn export_patient_bundle(&self, email: &EmailAddress) -> BundleResult<Option<StoredBundle>> {
        self.patients().find_by_email(email)
    }

    /// Every exercise bundle for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::NotFound`] when the user has never uploaded.
    pub fn export_exercise_bundles(&self, user_id: &UserId) -> BundleResult<Vec<StoredBundle>> {
        let bundles = self.exercises().find_all_for_user(user_id)?;
        if bundles.is_empty() {
            return Err(BundleError::NotFound {
                collection: Collection::Exercises,
                query: format!("{} = '{user_id}'", MarkerLabel::UserId),
            });
        }
        Ok(bundles)
    }
}
