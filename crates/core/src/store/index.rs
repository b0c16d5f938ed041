//! Per-collection document state shared by both stores.
//!
//! Documents are kept in insertion order. The [`MarkerIndex`] maps `(label, normalised value)`
//! to document positions so marker lookups do not scan every bundle; the full filter is still
//! evaluated on each candidate.

use super::{DocumentId, StoredBundle};
use crate::query::{index_value, BundleFilter};
use fhir::{MarkerLabel, Resource};
use std::collections::{BTreeSet, HashMap};

/// Secondary index from marker `(label, normalised value)` to document positions.
#[derive(Debug, Default)]
pub(crate) struct MarkerIndex {
    entries: HashMap<(MarkerLabel, String), BTreeSet<usize>>,
}

impl MarkerIndex {
    fn add_entries<'a>(&mut self, position: usize, entries: impl IntoIterator<Item = &'a Resource>) {
        for marker in entries.into_iter().filter_map(Resource::as_marker) {
            self.entries
                .entry((marker.label, index_value(&marker.value)))
                .or_default()
                .insert(position);
        }
    }

    fn positions(&self, key: &(MarkerLabel, String)) -> BTreeSet<usize> {
        self.entries.get(key).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub(crate) struct CollectionState {
    documents: Vec<StoredBundle>,
    positions: HashMap<DocumentId, usize>,
    index: MarkerIndex,
}

impl CollectionState {
    pub(crate) fn len(&self) -> usize {
        self.documents.len()
    }

    pub(crate) fn contains(&self, id: &DocumentId) -> bool {
        self.positions.contains_key(id)
    }

    pub(crate) fn get(&self, id: &DocumentId) -> Option<&StoredBundle> {
        self.positions.get(id).map(|&position| &self.documents[position])
    }

    pub(crate) fn insert(&mut self, document: StoredBundle) {
        let position = self.documents.len();
        self.index.add_entries(position, &document.bundle.entries);
        self.positions.insert(document.id.clone(), position);
        self.documents.push(document);
    }

    /// Appends `entries` to the document; returns false when the document is unknown.
    pub(crate) fn append(&mut self, id: &DocumentId, entries: &[Resource]) -> bool {
        let Some(&position) = self.positions.get(id) else {
            return false;
        };
        self.index.add_entries(position, entries);
        self.documents[position]
            .bundle
            .entries
            .extend(entries.iter().cloned());
        true
    }

    /// Matching documents in insertion order, at most `limit` of them.
    pub(crate) fn find(&self, filter: &BundleFilter, limit: Option<usize>) -> Vec<StoredBundle> {
        let limit = limit.unwrap_or(usize::MAX);

        let mut candidates: Option<BTreeSet<usize>> = None;
        for key in filter.predicates().iter().filter_map(|p| p.index_key()) {
            let hits = self.index.positions(&key);
            candidates = Some(match candidates {
                None => hits,
                Some(current) => current.intersection(&hits).copied().collect(),
            });
        }

        let matches_filter = |position: &usize| filter.matches(&self.documents[*position].bundle);
        let pick = |position: usize| self.documents[position].clone();

        match candidates {
            Some(positions) => positions
                .into_iter()
                .filter(matches_filter)
                .take(limit)
                .map(pick)
                .collect(),
            None => (0..self.documents.len())
                .filter(matches_filter)
                .take(limit)
                .map(pick)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{EntryPredicate, MatchPolicy};
    use fhir::{encode_marker, Bundle};

    fn stored(user_id: &str, email: &str) -> StoredBundle {
        StoredBundle {
            id: DocumentId::new(),
            bundle: Bundle::collection(vec![
                encode_marker(MarkerLabel::UserId, user_id).into(),
                encode_marker(MarkerLabel::Email, email).into(),
            ]),
        }
    }

    #[test]
    fn finds_through_index_in_insertion_order() {
        let mut state = CollectionState::default();
        let first = stored("1", "shared@example.com");
        let second = stored("2", "other@example.com");
        let third = stored("3", "shared@example.com");
        state.insert(first.clone());
        state.insert(second);
        state.insert(third.clone());

        let filter = BundleFilter::marker(MarkerLabel::Email, "shared@example.com", MatchPolicy::Exact);
        let found = state.find(&filter, None);
        assert_eq!(found, vec![first.clone(), third]);
        assert_eq!(state.find(&filter, Some(1)), vec![first]);
    }

    #[test]
    fn index_candidates_are_reverified() {
        let mut state = CollectionState::default();
        state.insert(stored("1", "Shared@Example.com"));

        let exact = BundleFilter::marker(MarkerLabel::Email, "shared@example.com", MatchPolicy::Exact);
        assert!(state.find(&exact, None).is_empty());

        let relaxed = BundleFilter::marker(
            MarkerLabel::Email,
            "shared@example.com",
            MatchPolicy::CaseInsensitive,
        );
        assert_eq!(state.find(&relaxed, None).len(), 1);
    }

    #[test]
    fn appended_markers_become_searchable() {
        let mut state = CollectionState::default();
        let document = stored("1", "a@example.com");
        let id = document.id.clone();
        state.insert(document);

        assert!(state.append(&id, &[encode_marker(MarkerLabel::Flag, "amber").into()]));
        let filter = BundleFilter::marker(MarkerLabel::Flag, "amber", MatchPolicy::Exact);
        assert_eq!(state.find(&filter, None).len(), 1);
        assert_eq!(state.get(&id).unwrap().bundle.entries.len(), 3);
    }

    #[test]
    fn append_to_unknown_document_is_rejected() {
        let mut state = CollectionState::default();
        assert!(!state.append(&DocumentId::new(), &[]));
        assert_eq!(state.len(), 0);
    }

    #[test]
    fn unindexed_predicates_fall_back_to_scan() {
        let mut state = CollectionState::default();
        state.insert(stored("1", "a@example.com"));
        let filter = BundleFilter::new(MatchPolicy::Exact)
            .with(EntryPredicate::patient_name("Anirudh", "Menon"));
        assert!(state.find(&filter, None).is_empty());
        assert_eq!(state.find(&BundleFilter::new(MatchPolicy::Exact), None).len(), 1);
    }
}
