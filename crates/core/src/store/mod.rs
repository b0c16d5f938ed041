//! Bundle persistence.
//!
//! [`BundleStore`] is the repository adapter the engine talks to. It knows nothing about
//! patients or exercises: it stores `collection` bundles under storage-assigned
//! [`DocumentId`]s, answers [`BundleFilter`] queries and appends entries to an existing
//! document's `entry` array.
//!
//! Two implementations ship with the crate:
//! - [`MemoryStore`] for tests and throwaway runs
//! - [`FileStore`], one sharded `bundle.json` per document on disk
//!
//! Both keep a secondary marker index per collection and apply `append_entries` atomically per
//! document.

mod file;
mod index;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::config::{CoreConfig, StoreBackend};
use crate::constants::{EXERCISE_COLLECTION_NAME, EXPORT_ID_FIELD, PATIENT_COLLECTION_NAME};
use crate::query::BundleFilter;
use fhir::{Bundle, FhirError, FhirResult, Resource, ShardableUuid};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A named set of bundles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    /// One patient bundle per registered patient.
    Patients,
    /// One exercise bundle per user id.
    Exercises,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Patients, Collection::Exercises];

    /// Storage name of the collection.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Patients => PATIENT_COLLECTION_NAME,
            Collection::Exercises => EXERCISE_COLLECTION_NAME,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage-assigned document identifier.
///
/// This is the only identity a document has outside its entries.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(ShardableUuid);

impl DocumentId {
    pub(crate) fn new() -> Self {
        Self(ShardableUuid::new())
    }

    /// Parses a canonical (32 lowercase hex) document id.
    pub fn parse(input: &str) -> Result<Self, physio_uuid::UuidError> {
        ShardableUuid::parse(input).map(Self)
    }

    pub fn as_uuid(&self) -> &ShardableUuid {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A bundle together with the id it is stored under.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredBundle {
    pub id: DocumentId,
    pub bundle: Bundle,
}

impl StoredBundle {
    /// Renders the bundle with its storage id under `"_id"`, the export shape.
    pub fn to_json_value(&self) -> FhirResult<serde_json::Value> {
        let mut value = self.bundle.to_json_value()?;
        if let Some(object) = value.as_object_mut() {
            object.insert(
                EXPORT_ID_FIELD.to_string(),
                serde_json::Value::String(self.id.to_string()),
            );
        }
        Ok(value)
    }
}

/// Errors raised by a [`BundleStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document {id} not found in {collection}")]
    DocumentNotFound {
        collection: Collection,
        id: DocumentId,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stored bundle {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: FhirError,
    },

    #[error("failed to serialise bundle: {0}")]
    Serialization(#[source] FhirError),

    #[error("store lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Repository adapter over a document store.
///
/// Implementations must apply [`append_entries`](BundleStore::append_entries) atomically per
/// document: concurrent appends to the same document never lose entries and never interleave
/// within one call.
pub trait BundleStore: Send + Sync {
    /// First matching bundle in insertion order.
    fn find_one(
        &self,
        collection: Collection,
        filter: &BundleFilter,
    ) -> StoreResult<Option<StoredBundle>> {
        Ok(self.find_many(collection, filter)?.into_iter().next())
    }

    /// Every matching bundle in insertion order.
    fn find_many(
        &self,
        collection: Collection,
        filter: &BundleFilter,
    ) -> StoreResult<Vec<StoredBundle>>;

    /// Stores `bundle` as a new document and returns its id.
    fn insert_one(&self, collection: Collection, bundle: &Bundle) -> StoreResult<DocumentId>;

    /// Appends `entries` to the end of the document's `entry` array.
    fn append_entries(
        &self,
        collection: Collection,
        id: &DocumentId,
        entries: &[Resource],
    ) -> StoreResult<()>;
}

/// Opens the store selected by `cfg`.
pub fn open_store(cfg: &CoreConfig) -> StoreResult<Arc<dyn BundleStore>> {
    match cfg.store_backend() {
        StoreBackend::Memory => {
            tracing::info!("using in-memory bundle store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::File(root) => {
            tracing::info!(root = %root.display(), "using file bundle store");
            Ok(Arc::new(FileStore::open(root)?))
        }
    }
}
