//! Canonical identifiers and sharded-path utilities.
//!
//! Two kinds of identifier in the physio workspace are UUIDs:
//! - the `id` of a bundle's Patient (identity) resource, allocated once at registration;
//! - the storage-assigned document id of every persisted bundle.
//!
//! Both use a *canonical* representation: **32 lowercase hexadecimal characters** (no hyphens),
//! the value produced by `Uuid::new_v4().simple().to_string()`. Externally supplied identifiers
//! must already be canonical; uppercase or hyphenated forms are rejected rather than normalised,
//! so a given identifier has exactly one spelling in every document and on disk.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, file-backed storage places data under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `patient_data/exercise_data/55/0e/550e8400e29b41d4a716446655440000/`
//!
//! This keeps the fan-out of any single directory bounded.

mod service;

// Re-export public types
pub use service::{ShardableUuid, Uuid};

/// Error type for UUID operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for UUID operations.
pub type UuidResult<T> = Result<T, UuidError>;
