//! Exercise bundle repository: the get-or-create-then-append merge.
//!
//! A subject has at most one exercise bundle, found through its `User Id` marker. The first
//! upload creates it with the join markers; every later upload appends observations to the same
//! document and leaves existing entries untouched.
//!
//! [`ExerciseBundles::merge`] is a lookup followed by a write. Callers must hold the subject's
//! lock (see [`SubjectLocks`]) for the duration of the call.
//!
//! [`SubjectLocks`]: crate::locks::SubjectLocks

use crate::builders::build_exercise_bundle;
use crate::query::{find_bundle_by_marker, find_bundles_by_marker, MatchPolicy};
use crate::records::ExerciseRecord;
use crate::store::{BundleStore, Collection, DocumentId, StoredBundle};
use crate::subject::SubjectLink;
use crate::{BundleError, BundleResult};
use fhir::{MarkerLabel, MarkerValue};
use physio_types::UserId;

/// Result of merging an upload batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadOutcome {
    /// True when the upload created the subject's exercise bundle.
    pub created: bool,
    pub user_id: UserId,
    pub document_id: DocumentId,
}

pub struct ExerciseBundles<'a> {
    store: &'a dyn BundleStore,
    policy: MatchPolicy,
}

impl<'a> ExerciseBundles<'a> {
    pub fn new(store: &'a dyn BundleStore, policy: MatchPolicy) -> Self {
        Self { store, policy }
    }

    /// The subject's exercise bundle, if one exists.
    pub fn find_for_user(&self, user_id: &UserId) -> BundleResult<Option<StoredBundle>> {
        Ok(find_bundle_by_marker(
            self.store,
            Collection::Exercises,
            MarkerLabel::UserId,
            user_id,
            self.policy,
        )?)
    }

    /// Every exercise bundle carrying `user_id`, in creation order.
    pub fn find_all_for_user(&self, user_id: &UserId) -> BundleResult<Vec<StoredBundle>> {
        Ok(find_bundles_by_marker(
            self.store,
            Collection::Exercises,
            MarkerLabel::UserId,
            user_id,
            self.policy,
        )?)
    }

    /// Merges `records` into the subject's exercise bundle, creating it if needed.
    ///
    /// # Errors
    ///
    /// - [`BundleError::InvariantViolation`] if the existing bundle points at a different
    ///   identity resource than `link`; nothing is written.
    /// - [`BundleError::Storage`] if the insert or append fails.
    pub fn merge(
        &self,
        link: &SubjectLink,
        records: &[ExerciseRecord],
    ) -> BundleResult<UploadOutcome> {
        let user_id = link.user_id();

        match self.find_for_user(user_id)? {
            Some(existing) => {
                check_back_reference(&existing, link)?;

                let additions = build_exercise_bundle(link, records, false);
                self.store.append_entries(
                    Collection::Exercises,
                    &existing.id,
                    &additions.entries,
                )?;

                tracing::info!(
                    document_id = %existing.id,
                    %user_id,
                    appended = additions.entries.len(),
                    "appended exercise observations"
                );

                Ok(UploadOutcome {
                    created: false,
                    user_id: user_id.clone(),
                    document_id: existing.id,
                })
            }
            None => {
                let bundle = build_exercise_bundle(link, records, true);
                let document_id = self.store.insert_one(Collection::Exercises, &bundle)?;

                tracing::info!(
                    %document_id,
                    %user_id,
                    observations = bundle.observations().count(),
                    "created exercise bundle"
                );

                Ok(UploadOutcome {
                    created: true,
                    user_id: user_id.clone(),
                    document_id,
                })
            }
        }
    }
}

fn check_back_reference(existing: &StoredBundle, link: &SubjectLink) -> BundleResult<()> {
    let expected = MarkerValue::from(link.identity_id());
    match existing.bundle.marker_value(MarkerLabel::PatientId) {
        Some(actual) if *actual != expected => Err(BundleError::InvariantViolation(format!(
            "exercise bundle {} for user {} references identity {actual}, expected {expected}",
            existing.id,
            link.user_id()
        ))),
        _ => Ok(()),
    }
}
