//! Collection repositories.
//!
//! Each repository owns the reads and writes against one collection. They borrow a
//! [`BundleStore`](crate::store::BundleStore) and hold no locks; [`BundleService`] composes them
//! under per-subject locks.
//!
//! [`BundleService`]: crate::service::BundleService

pub mod exercise;
pub mod patient;

pub use exercise::{ExerciseBundles, UploadOutcome};
pub use patient::{PatientBundles, Registered};
