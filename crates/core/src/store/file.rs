//! Sharded JSON file store.
//!
//! Each document lives at `<root>/<collection>/<s1>/<s2>/<document id>/bundle.json`, where
//! `s1`/`s2` are the first two byte pairs of the document id. The whole store is loaded on
//! [`FileStore::open`] (rebuilding the marker index) and every mutation is written through to
//! disk before the in-memory state changes, so a failed write leaves both untouched.
//!
//! Files are replaced via a temporary sibling and a rename, so readers never observe a
//! half-written bundle.

use super::index::CollectionState;
use super::{BundleStore, Collection, DocumentId, StoreError, StoreResult, StoredBundle};
use crate::constants::{BUNDLE_JSON_FILENAME, BUNDLE_JSON_TMP_FILENAME};
use crate::query::BundleFilter;
use fhir::{Bundle, Resource};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// File-backed [`BundleStore`].
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    patients: RwLock<CollectionState>,
    exercises: RwLock<CollectionState>,
}

impl FileStore {
    /// Opens (creating if needed) the store rooted at `root` and loads every bundle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a collection directory cannot be created or read, or if a
    /// `bundle.json` file cannot be decoded.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        let store = Self {
            patients: RwLock::new(load_collection(&root, Collection::Patients)?),
            exercises: RwLock::new(load_collection(&root, Collection::Exercises)?),
            root,
        };
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection: Collection) -> PathBuf {
        self.root.join(collection.name())
    }

    fn document_file(&self, collection: Collection, id: &DocumentId) -> PathBuf {
        id.as_uuid()
            .sharded_dir(&self.collection_dir(collection))
            .join(BUNDLE_JSON_FILENAME)
    }

    fn state(&self, collection: Collection) -> &RwLock<CollectionState> {
        match collection {
            Collection::Patients => &self.patients,
            Collection::Exercises => &self.exercises,
        }
    }

    fn read(&self, collection: Collection) -> StoreResult<RwLockReadGuard<'_, CollectionState>> {
        self.state(collection)
            .read()
            .map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self, collection: Collection) -> StoreResult<RwLockWriteGuard<'_, CollectionState>> {
        self.state(collection)
            .write()
            .map_err(|_| StoreError::LockPoisoned)
    }
}

impl BundleStore for FileStore {
    fn find_one(
        &self,
        collection: Collection,
        filter: &BundleFilter,
    ) -> StoreResult<Option<StoredBundle>> {
        Ok(self
            .read(collection)?
            .find(filter, Some(1))
            .into_iter()
            .next())
    }

    fn find_many(
        &self,
        collection: Collection,
        filter: &BundleFilter,
    ) -> StoreResult<Vec<StoredBundle>> {
        Ok(self.read(collection)?.find(filter, None))
    }

    fn insert_one(&self, collection: Collection, bundle: &Bundle) -> StoreResult<DocumentId> {
        let mut state = self.write(collection)?;
        let collection_dir = self.collection_dir(collection);
        let id = allocate_document_dir(&collection_dir, DocumentId::new)?;

        write_bundle(&self.document_file(collection, &id), bundle)?;
        state.insert(StoredBundle {
            id: id.clone(),
            bundle: bundle.clone(),
        });
        Ok(id)
    }

    fn append_entries(
        &self,
        collection: Collection,
        id: &DocumentId,
        entries: &[Resource],
    ) -> StoreResult<()> {
        let mut state = self.write(collection)?;
        let mut updated = state
            .get(id)
            .map(|stored| stored.bundle.clone())
            .ok_or_else(|| StoreError::DocumentNotFound {
                collection,
                id: id.clone(),
            })?;
        updated.entries.extend(entries.iter().cloned());

        write_bundle(&self.document_file(collection, id), &updated)?;
        state.append(id, entries);
        Ok(())
    }
}

/// Allocates a fresh document id whose sharded directory does not yet exist, and creates it.
///
/// Guards against pathological id collisions (or directories created behind the store's back)
/// by retrying a bounded number of times.
fn allocate_document_dir(
    collection_dir: &Path,
    mut id_source: impl FnMut() -> DocumentId,
) -> StoreResult<DocumentId> {
    for _attempt in 0..5 {
        let id = id_source();
        let candidate = id.as_uuid().sharded_dir(collection_dir);

        if candidate.exists() {
            continue;
        }

        if let Some(parent) = candidate.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(id),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(source) => {
                return Err(StoreError::CreateDir {
                    path: candidate,
                    source,
                })
            }
        }
    }

    Err(StoreError::CreateDir {
        path: collection_dir.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "failed to allocate a unique document directory after 5 attempts",
        ),
    })
}

fn write_bundle(path: &Path, bundle: &Bundle) -> StoreResult<()> {
    let text = bundle.render().map_err(StoreError::Serialization)?;
    let tmp_path = path.with_file_name(BUNDLE_JSON_TMP_FILENAME);

    fs::write(&tmp_path, text).map_err(|source| StoreError::Write {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn read_dir_or_empty(path: &Path) -> StoreResult<Vec<PathBuf>> {
    match fs::read_dir(path) {
        Ok(entries) => Ok(entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|p| p.is_dir())
            .collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(StoreError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Loads every bundle of `collection` under `root`, ordered by bundle timestamp then id.
fn load_collection(root: &Path, collection: Collection) -> StoreResult<CollectionState> {
    let collection_dir = root.join(collection.name());
    fs::create_dir_all(&collection_dir).map_err(|source| StoreError::CreateDir {
        path: collection_dir.clone(),
        source,
    })?;

    let mut documents = Vec::new();
    for s1_path in read_dir_or_empty(&collection_dir)? {
        for s2_path in read_dir_or_empty(&s1_path)? {
            for id_path in read_dir_or_empty(&s2_path)? {
                let Some(id) = id_path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .and_then(|name| DocumentId::parse(name).ok())
                else {
                    tracing::warn!(path = %id_path.display(), "skipping non-document directory");
                    continue;
                };

                let bundle_path = id_path.join(BUNDLE_JSON_FILENAME);
                if !bundle_path.is_file() {
                    // Allocated but never written; the insert that created it failed.
                    continue;
                }

                let contents =
                    fs::read_to_string(&bundle_path).map_err(|source| StoreError::Read {
                        path: bundle_path.clone(),
                        source,
                    })?;
                let bundle = Bundle::parse(&contents).map_err(|source| StoreError::Corrupt {
                    path: bundle_path.clone(),
                    source,
                })?;
                documents.push(StoredBundle { id, bundle });
            }
        }
    }

    documents.sort_by(|a, b| {
        a.bundle
            .timestamp
            .cmp(&b.bundle.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut state = CollectionState::default();
    for document in documents {
        state.insert(document);
    }
    tracing::debug!(%collection, documents = state.len(), "loaded collection");
    Ok(state)
}
