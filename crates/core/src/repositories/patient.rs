//! Patient bundle repository.
//!
//! Owns every read and write against the `patient_data` collection:
//! - registration (duplicate check then insert)
//! - lookups by email, by clinician, and by email plus name
//!
//! Callers serialise registrations for the same email through [`SubjectLocks`] before calling
//! [`PatientBundles::register`]; the repository itself holds no locks.
//!
//! [`SubjectLocks`]: crate::locks::SubjectLocks

use crate::builders::build_patient_bundle;
use crate::query::{
    find_bundle_by_compound_markers, find_bundle_by_marker, find_bundles_by_marker,
    EntryPredicate, MatchPolicy,
};
use crate::records::PatientRegistration;
use crate::store::{BundleStore, Collection, DocumentId, StoredBundle};
use crate::subject::SubjectLink;
use crate::{BundleError, BundleResult};
use fhir::{Bundle, MarkerLabel};
use physio_types::{EmailAddress, NonEmptyText};

/// Result of a successful registration.
#[derive(Clone, Debug, PartialEq)]
pub struct Registered {
    pub document_id: DocumentId,
    pub bundle: Bundle,
    pub link: SubjectLink,
}

/// Patient bundle operations over a store.
pub struct PatientBundles<'a> {
    store: &'a dyn BundleStore,
    policy: MatchPolicy,
}

impl<'a> PatientBundles<'a> {
    pub fn new(store: &'a dyn BundleStore, policy: MatchPolicy) -> Self {
        Self { store, policy }
    }

    /// Builds and stores the patient bundle for `registration`.
    ///
    /// # Errors
    ///
    /// - [`BundleError::Conflict`] if a patient bundle already carries the same `Email` or
    ///   `User Id` marker; nothing is written.
    /// - [`BundleError::Storage`] if the store fails.
    pub fn register(&self, registration: &PatientRegistration) -> BundleResult<Registered> {
        self.ensure_unique(MarkerLabel::Email, registration.email.as_str())?;
        self.ensure_unique(MarkerLabel::UserId, registration.user_id.as_str())?;

        let built = build_patient_bundle(registration);
        let document_id = self.store.insert_one(Collection::Patients, &built.bundle)?;

        tracing::info!(
            %document_id,
            user_id = %registration.user_id,
            identity_id = %built.link.identity_id(),
            "registered patient"
        );

        Ok(Registered {
            document_id,
            bundle: built.bundle,
            link: built.link,
        })
    }

    fn ensure_unique(&self, label: MarkerLabel, value: &str) -> BundleResult<()> {
        let existing =
            find_bundle_by_marker(self.store, Collection::Patients, label, value, self.policy)?;
        match existing {
            Some(stored) => {
                tracing::debug!(document_id = %stored.id, %label, "duplicate registration");
                Err(BundleError::Conflict {
                    collection: Collection::Patients,
                    label,
                    value: value.to_string(),
                })
            }
            None => Ok(()),
        }
    }

    /// The patient bundle registered with `email`, if any.
    pub fn find_by_email(&self, email: &EmailAddress) -> BundleResult<Option<StoredBundle>> {
        Ok(find_bundle_by_marker(
            self.store,
            Collection::Patients,
            MarkerLabel::Email,
            email,
            self.policy,
        )?)
    }

    /// Every patient bundle assigned to `clinician_email`, in registration order.
    pub fn find_for_clinician(
        &self,
        clinician_email: &EmailAddress,
    ) -> BundleResult<Vec<StoredBundle>> {
        Ok(find_bundles_by_marker(
            self.store,
            Collection::Patients,
            MarkerLabel::TherapistAssigned,
            clinician_email,
            self.policy,
        )?)
    }

    /// Resolves the subject registered with `email` under the given first and last name.
    ///
    /// # Errors
    ///
    /// - [`BundleError::NotFound`] if no patient bundle carries the email marker and a Patient
    ///   resource with that name.
    /// - [`BundleError::InvariantViolation`] if the matching bundle has no identity resource or
    ///   no `User Id` marker.
    pub fn resolve_subject(
        &self,
        email: &EmailAddress,
        first_name: &NonEmptyText,
        last_name: &NonEmptyText,
    ) -> BundleResult<SubjectLink> {
        let predicates = [
            EntryPredicate::marker(MarkerLabel::Email, email),
            EntryPredicate::patient_name(first_name.as_str(), last_name.as_str()),
        ];
        let query = predicates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" AND ");

        let stored = find_bundle_by_compound_markers(
            self.store,
            Collection::Patients,
            predicates,
            self.policy,
        )?
        .ok_or(BundleError::NotFound {
            collection: Collection::Patients,
            query,
        })?;

        SubjectLink::from_patient_bundle(&stored.bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use fhir::MarkerValue;
    use physio_types::UserId;

    fn registration(user_id: &str, email: &str) -> PatientRegistration {
        PatientRegistration {
            user_id: UserId::new(user_id).unwrap(),
            therapist_assigned: EmailAddress::parse("therapist@gmail.com").unwrap(),
            username: Some("APM".into()),
            first_name: NonEmptyText::new("Anirudh").unwrap(),
            last_name: NonEmptyText::new("Menon").unwrap(),
            email: EmailAddress::parse(email).unwrap(),
            dob: Some("22-08-2024".into()),
            blood_group: Some("O+".into()),
            flag: 1,
            height: Some(176),
            weight: Some(70),
            gender: Some("male".into()),
        }
    }

    fn email(text: &str) -> EmailAddress {
        EmailAddress::parse(text).unwrap()
    }

    fn name(text: &str) -> NonEmptyText {
        NonEmptyText::new(text).unwrap()
    }

    #[test]
    fn register_then_find_by_email_round_trips() {
        let store = MemoryStore::new();
        let patients = PatientBundles::new(&store, MatchPolicy::Exact);

        let registered = patients.register(&registration("12345", "APM@gmail.com")).unwrap();
        let found = patients.find_by_email(&email("APM@gmail.com")).unwrap().unwrap();

        assert_eq!(found.id, registered.document_id);
        assert_eq!(found.bundle, registered.bundle);
        assert_eq!(
            found.bundle.marker_value(MarkerLabel::UserId),
            Some(&MarkerValue::Text("12345".into()))
        );
    }

    #[test]
    fn duplicate_email_is_a_conflict_and_writes_nothing() {
        let store = MemoryStore::new();
        let patients = PatientBundles::new(&store, MatchPolicy::Exact);
        patients.register(&registration("1", "APM@gmail.com")).unwrap();

        match patients.register(&registration("2", "APM@gmail.com")) {
            Err(BundleError::Conflict { label, value, .. }) => {
                assert_eq!(label, MarkerLabel::Email);
                assert_eq!(value, "APM@gmail.com");
            }
            other => panic!("expected Conflict, got {other:?}"),
        }

        let clinician = patients
            .find_for_clinician(&email("therapist@gmail.com"))
            .unwrap();
        assert_eq!(clinician.len(), 1);
    }

    #[test]
    fn duplicate_user_id_is_a_conflict() {
        let store = MemoryStore::new();
        let patients = PatientBundles::new(&store, MatchPolicy::Exact);
        patients.register(&registration("1", "a@gmail.com")).unwrap();

        assert!(matches!(
            patients.register(&registration("1", "b@gmail.com")),
            Err(BundleError::Conflict {
                label: MarkerLabel::UserId,
                ..
            })
        ));
    }

    #[test]
    fn email_casing_follows_match_policy() {
        let store = MemoryStore::new();
        PatientBundles::new(&store, MatchPolicy::Exact)
            .register(&registration("1", "APM@gmail.com"))
            .unwrap();

        let exact = PatientBundles::new(&store, MatchPolicy::Exact);
        assert!(exact.find_by_email(&email("apm@gmail.com")).unwrap().is_none());
        assert!(exact.register(&registration("2", "apm@gmail.com")).is_ok());

        let relaxed = PatientBundles::new(&store, MatchPolicy::CaseInsensitive);
        assert!(relaxed.register(&registration("3", "Apm@Gmail.com")).is_err());
    }

    #[test]
    fn resolve_subject_requires_email_and_name() {
        let store = MemoryStore::new();
        let patients = PatientBundles::new(&store, MatchPolicy::Exact);
        let registered = patients.register(&registration("12345", "APM@gmail.com")).unwrap();

        let link = patients
            .resolve_subject(&email("APM@gmail.com"), &name("Anirudh"), &name("Menon"))
            .unwrap();
        assert_eq!(link, registered.link);

        match patients.resolve_subject(&email("APM@gmail.com"), &name("Anirudh"), &name("Nair")) {
            Err(BundleError::NotFound { collection, query }) => {
                assert_eq!(collection, Collection::Patients);
                assert!(query.contains("Nair"), "{query}");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn unknown_clinician_has_no_patients() {
        let store = MemoryStore::new();
        let patients = PatientBundles::new(&store, MatchPolicy::Exact);
        assert!(patients
            .find_for_clinician(&email("nobody@gmail.com"))
            .unwrap()
            .is_empty());
    }
}
