//! Process-local bundle store.

use super::index::CollectionState;
use super::{BundleStore, Collection, DocumentId, StoreError, StoreResult, StoredBundle};
use crate::query::BundleFilter;
use fhir::{Bundle, Resource};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory [`BundleStore`]. Contents are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    patients: RwLock<CollectionState>,
    exercises: RwLock<CollectionState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
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

impl BundleStore for MemoryStore {
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
        let mut id = DocumentId::new();
        while state.contains(&id) {
            id = DocumentId::new();
        }
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
        if self.write(collection)?.append(id, entries) {
            Ok(())
        } else {
            Err(StoreError::DocumentNotFound {
                collection,
                id: id.clone(),
            })
        }
    }
}
