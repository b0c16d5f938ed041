//! Constants used throughout the physio core crate.
//!
//! Collection names, filenames and environment variable names live here so the stores, the
//! runner and the CLI agree on them.

/// Collection holding one patient bundle per registered patient.
pub const PATIENT_COLLECTION_NAME: &str = "patient_data";

/// Collection holding one exercise bundle per user id.
pub const EXERCISE_COLLECTION_NAME: &str = "exercise_data";

/// Default root directory for the file store when no explicit directory is configured.
///
/// Collections are created beneath it, so it must not share a collection's name.
pub const DEFAULT_DATA_DIR: &str = "physio_data";

/// Filename of a persisted bundle inside its sharded document directory.
pub const BUNDLE_JSON_FILENAME: &str = "bundle.json";

/// Temporary filename used while replacing a bundle file.
pub const BUNDLE_JSON_TMP_FILENAME: &str = "bundle.json.tmp";

/// Field name carrying the storage id when a bundle is exported.
pub const EXPORT_ID_FIELD: &str = "_id";

/// Media type of exported bundles.
pub const FHIR_JSON_MEDIA_TYPE: &str = "application/fhir+json";

/// Environment variable selecting the store backend (`memory` or `file`).
pub const ENV_STORE: &str = "PHYSIO_STORE";

/// Environment variable naming the file store root.
pub const ENV_PATIENT_DATA_DIR: &str = "PATIENT_DATA_DIR";

/// Environment variable selecting marker matching (`exact` or `case-insensitive`).
pub const ENV_MARKER_MATCH: &str = "PHYSIO_MARKER_MATCH";
