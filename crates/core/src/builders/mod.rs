//! Pure bundle builders.
//!
//! Builders turn flat domain records into `collection` bundles. They never read or write the
//! store; the repositories decide what to build and where it goes.

pub mod exercise;
pub mod patient;

pub use exercise::{build_exercise_bundle, exercise_observations};
pub use patient::{build_patient_bundle, PatientBundle};
