//! The controlled vocabulary of marker labels.
//!
//! Every marker observation written into a bundle carries one of these labels as its
//! `code.text`, and every lookup matches against the same text. Defining the strings in one
//! enum keeps writers and readers from drifting apart (a typo on either side would otherwise be
//! a silent query miss).

use std::fmt;

/// Label of a marker observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkerLabel {
    /// Join key shared by a patient bundle and its exercise bundle.
    UserId,
    /// Patient email; unique across the patient collection.
    Email,
    /// Email of the clinician the patient is assigned to.
    TherapistAssigned,
    Username,
    BloodGroup,
    /// Integer status flag carried over from registration.
    Flag,
    /// Height in centimetres.
    Height,
    /// Weight in kilograms.
    Weight,
    /// Back-reference from an exercise bundle to the identity resource id.
    PatientId,
}

impl MarkerLabel {
    /// All labels, in the order a patient bundle lists its markers.
    pub const ALL: [MarkerLabel; 9] = [
        MarkerLabel::UserId,
        MarkerLabel::Email,
        MarkerLabel::TherapistAssigned,
        MarkerLabel::Username,
        MarkerLabel::BloodGroup,
        MarkerLabel::Flag,
        MarkerLabel::Height,
        MarkerLabel::Weight,
        MarkerLabel::PatientId,
    ];

    /// The exact `code.text` written to and matched in documents.
    pub fn as_text(self) -> &'static str {
        match self {
            MarkerLabel::UserId => "User Id",
            MarkerLabel::Email => "Email",
            MarkerLabel::TherapistAssigned => "Therapist Assigned",
            MarkerLabel::Username => "Username",
            MarkerLabel::BloodGroup => "Blood Group",
            MarkerLabel::Flag => "Flag",
            MarkerLabel::Height => "Height",
            MarkerLabel::Weight => "Weight",
            MarkerLabel::PatientId => "Patient Id",
        }
    }

    /// Reverse of [`MarkerLabel::as_text`]. Matching is exact.
    pub fn from_text(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|label| label.as_text() == text)
    }
}

impl fmt::Display for MarkerLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_text())
    }
}
