//! # Physio Core
//!
//! Bundle synthesis and incremental-merge engine.
//!
//! This crate turns flat patient registrations and exercise telemetry into FHIR-like
//! `collection` bundles, persists them, and later finds them again by the marker entries they
//! embed:
//! - [`builders`]: pure functions from records to bundles
//! - [`store`]: the [`BundleStore`] adapter and its memory and file implementations
//! - [`query`]: element-match filters over bundle entries
//! - [`repositories`]: per-collection operations (registration, merge)
//! - [`service`]: [`BundleService`], the locked entry point used by the outer surfaces
//!
//! **No API concerns**: HTTP routing and command-line parsing belong in `api-rest` and
//! `physio-cli`.

pub mod builders;
pub mod config;
pub mod constants;
pub mod error;
pub mod locks;
pub mod query;
pub mod records;
pub mod repositories;
pub mod service;
pub mod store;
pub mod subject;
pub mod validation;

pub use config::{CoreConfig, StoreBackend};
pub use error::{BundleError, BundleResult, ErrorKind};
pub use query::{BundleFilter, EntryPredicate, MatchPolicy};
pub use records::{ExerciseRecord, PatientRegistration};
pub use repositories::{Registered, UploadOutcome};
pub use service::BundleService;
pub use store::{BundleStore, Collection, DocumentId, StoreError, StoredBundle};
pub use subject::SubjectLink;

// Re-export the shared types callers need to build inputs.
pub use physio_types::{EmailAddress, NonEmptyText, TextError, UserId};
