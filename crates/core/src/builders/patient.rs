//! Patient bundle builder.
//!
//! Entry order is fixed: the Patient resource first, then one marker per present attribute in
//! the order `User Id`, `Email`, `Therapist Assigned`, `Username`, `Blood Group`, `Flag`,
//! `Height`, `Weight`. Absent or blank optional attributes produce no marker.

use crate::records::{present, PatientRegistration};
use crate::subject::SubjectLink;
use fhir::{encode_marker, Bundle, IdentityResource, MarkerLabel, NameUse, Resource, ShardableUuid};

/// A freshly built patient bundle and the link it establishes.
#[derive(Clone, Debug, PartialEq)]
pub struct PatientBundle {
    pub bundle: Bundle,
    pub link: SubjectLink,
}

pub fn build_patient_bundle(registration: &PatientRegistration) -> PatientBundle {
    let identity = IdentityResource {
        id: ShardableUuid::new(),
        use_type: Some(NameUse::Official),
        family: Some(registration.last_name.as_str().to_owned()),
        given: vec![registration.first_name.as_str().to_owned()],
        birth_date: present(registration.dob.as_deref()).map(str::to_owned),
        gender: present(registration.gender.as_deref()).map(str::to_owned),
    };
    let link = SubjectLink::new(registration.user_id.clone(), identity.id.clone());

    let mut entries = vec![
        Resource::Identity(identity),
        encode_marker(MarkerLabel::UserId, &registration.user_id).into(),
        encode_marker(MarkerLabel::Email, &registration.email).into(),
        encode_marker(MarkerLabel::TherapistAssigned, &registration.therapist_assigned).into(),
    ];

    if let Some(username) = present(registration.username.as_deref()) {
        entries.push(encode_marker(MarkerLabel::Username, username).into());
    }
    if let Some(blood_group) = present(registration.blood_group.as_deref()) {
        entries.push(encode_marker(MarkerLabel::BloodGroup, blood_group).into());
    }
    entries.push(encode_marker(MarkerLabel::Flag, registration.flag).into());
    if let Some(height) = registration.height {
        entries.push(encode_marker(MarkerLabel::Height, height).into());
    }
    if let Some(weight) = registration.weight {
        entries.push(encode_marker(MarkerLabel::Weight, weight).into());
    }

    PatientBundle {
        bundle: Bundle::collection(entries),
        link,
    }
}
