//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as
//! `Arc<CoreConfig>`. The parsing helpers take `Option<String>` values rather than reading the
//! environment themselves, so request handling never touches process-wide state and tests can
//! exercise every branch directly.

use crate::constants::DEFAULT_DATA_DIR;
use crate::query::MatchPolicy;
use crate::{BundleError, BundleResult};
use std::path::{Path, PathBuf};

/// Where bundles are persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local store; contents are lost on exit.
    Memory,
    /// Sharded JSON files under the given root directory.
    File(PathBuf),
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    store_backend: StoreBackend,
    match_policy: MatchPolicy,
}

impl CoreConfig {
    pub fn new(store_backend: StoreBackend, match_policy: MatchPolicy) -> Self {
        Self {
            store_backend,
            match_policy,
        }
    }

    /// In-memory store with exact matching.
    pub fn in_memory() -> Self {
        Self::new(StoreBackend::Memory, MatchPolicy::Exact)
    }

    pub fn store_backend(&self) -> &StoreBackend {
        &self.store_backend
    }

    /// Root directory of the file store, if that backend is selected.
    pub fn patient_data_dir(&self) -> Option<&Path> {
        match &self.store_backend {
            StoreBackend::File(dir) => Some(dir),
            StoreBackend::Memory => None,
        }
    }

    pub fn match_policy(&self) -> MatchPolicy {
        self.match_policy
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the store backend from optional `PHYSIO_STORE` and `PATIENT_DATA_DIR` values.
///
/// A missing or blank kind selects the file store. A missing or blank directory falls back to
/// [`DEFAULT_DATA_DIR`]. The directory is ignored for the memory store.
pub fn store_backend_from_env_values(
    kind: Option<String>,
    data_dir: Option<String>,
) -> BundleResult<StoreBackend> {
    let kind = non_blank(kind).unwrap_or_else(|| "file".to_string());

    match kind.to_ascii_lowercase().as_str() {
        "memory" => Ok(StoreBackend::Memory),
        "file" => {
            let dir = non_blank(data_dir).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
            Ok(StoreBackend::File(PathBuf::from(dir)))
        }
        other => Err(BundleError::InvalidInput(format!(
            "unknown store backend '{other}' (expected 'memory' or 'file')"
        ))),
    }
}

/// Parse the marker matching policy from an optional `PHYSIO_MARKER_MATCH` value.
///
/// If `value` is `None` or empty/whitespace, returns [`MatchPolicy::Exact`].
pub fn match_policy_from_env_value(value: Option<String>) -> BundleResult<MatchPolicy> {
    non_blank(value)
        .map(|v| v.parse::<MatchPolicy>())
        .transpose()
        .map(|policy| policy.unwrap_or(MatchPolicy::Exact))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_defaults_to_file_store() {
        let backend = store_backend_from_env_values(None, None).unwrap();
        assert_eq!(
            backend,
            StoreBackend::File(PathBuf::from(DEFAULT_DATA_DIR))
        );
    }

    #[test]
    fn default_root_is_not_a_collection_dir() {
        use crate::constants::{EXERCISE_COLLECTION_NAME, PATIENT_COLLECTION_NAME};

        assert_ne!(DEFAULT_DATA_DIR, PATIENT_COLLECTION_NAME);
        assert_ne!(DEFAULT_DATA_DIR, EXERCISE_COLLECTION_NAME);
    }

    #[test]
    fn store_backend_uses_explicit_dir() {
        let backend =
            store_backend_from_env_values(Some("file".into()), Some(" /srv/physio ".into()))
                .unwrap();
        assert_eq!(backend, StoreBackend::File(PathBuf::from("/srv/physio")));
    }

    #[test]
    fn store_backend_memory_ignores_dir() {
        let backend =
            store_backend_from_env_values(Some("Memory".into()), Some("/srv".into())).unwrap();
        assert_eq!(backend, StoreBackend::Memory);
    }

    #[test]
    fn store_backend_rejects_unknown_kind() {
        let err = store_backend_from_env_values(Some("mongo".into()), None).unwrap_err();
        assert!(err.to_string().contains("mongo"));
    }

    #[test]
    fn match_policy_parsing() {
        assert_eq!(match_policy_from_env_value(None).unwrap(), MatchPolicy::Exact);
        assert_eq!(
            match_policy_from_env_value(Some("  ".into())).unwrap(),
            MatchPolicy::Exact
        );
        assert_eq!(
            match_policy_from_env_value(Some("case-insensitive".into())).unwrap(),
            MatchPolicy::CaseInsensitive
        );
        assert!(match_policy_from_env_value(Some("fuzzy".into())).is_err());
    }

    #[test]
    fn patient_data_dir_only_for_file_store() {
        assert!(CoreConfig::in_memory().patient_data_dir().is_none());
        let cfg = CoreConfig::new(StoreBackend::File("/data".into()), MatchPolicy::Exact);
        assert_eq!(cfg.patient_data_dir(), Some(Path::new("/data")));
    }
}
