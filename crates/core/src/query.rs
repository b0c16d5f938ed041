//! Query façade: locating bundles by their embedded entries.
//!
//! A bundle document has no identity at its root. Apart from the storage-assigned
//! [`DocumentId`](crate::store::DocumentId), everything addressable about it is discovered by
//! scanning its `entry` array. Queries are therefore expressed as element predicates:
//! a [`BundleFilter`] is a conjunction of [`EntryPredicate`]s, and a bundle matches when every
//! predicate is satisfied by at least one of its entries (not necessarily the same one).
//!
//! Stores answer marker predicates through their secondary index and re-check candidates with
//! [`BundleFilter::matches`], so this module is the single definition of what "matches" means.

use crate::store::{BundleStore, Collection, StoreResult, StoredBundle};
use crate::BundleError;
use fhir::{Bundle, MarkerLabel, MarkerValue, Resource};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// How string values are compared.
///
/// Identifier markers (`User Id`, `Patient Id`) are always compared exactly: they are join keys
/// and must match byte for byte regardless of policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Byte-for-byte comparison.
    #[default]
    Exact,
    /// Unicode lowercase comparison.
    CaseInsensitive,
}

impl MatchPolicy {
    pub fn normalize<'a>(self, text: &'a str) -> Cow<'a, str> {
        match self {
            MatchPolicy::Exact => Cow::Borrowed(text),
            MatchPolicy::CaseInsensitive => Cow::Owned(text.to_lowercase()),
        }
    }

    pub fn text_eq(self, left: &str, right: &str) -> bool {
        match self {
            MatchPolicy::Exact => left == right,
            MatchPolicy::CaseInsensitive => left.to_lowercase() == right.to_lowercase(),
        }
    }

    /// Compares two marker values carried under `label`.
    pub fn value_eq(self, label: MarkerLabel, left: &MarkerValue, right: &MarkerValue) -> bool {
        let policy = if is_identifier(label) {
            MatchPolicy::Exact
        } else {
            self
        };

        match (left, right) {
            (MarkerValue::Text(a), MarkerValue::Text(b)) => policy.text_eq(a, b),
            (MarkerValue::Integer(a), MarkerValue::Integer(b)) => a == b,
            _ => false,
        }
    }
}

fn is_identifier(label: MarkerLabel) -> bool {
    matches!(label, MarkerLabel::UserId | MarkerLabel::PatientId)
}

impl FromStr for MatchPolicy {
    type Err = BundleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(MatchPolicy::Exact),
            "case-insensitive" | "case_insensitive" | "insensitive" => {
                Ok(MatchPolicy::CaseInsensitive)
            }
            other => Err(BundleError::InvalidInput(format!(
                "unknown marker match policy '{other}' (expected 'exact' or 'case-insensitive')"
            ))),
        }
    }
}

/// A predicate over a single bundle entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryPredicate {
    /// A marker observation with this label and value.
    Marker { label: MarkerLabel, value: MarkerValue },
    /// A Patient resource whose primary name has this first given name and family name.
    PatientName { given: String, family: String },
}

impl EntryPredicate {
    pub fn marker(label: MarkerLabel, value: impl Into<MarkerValue>) -> Self {
        EntryPredicate::Marker {
            label,
            value: value.into(),
        }
    }

    pub fn patient_name(given: impl Into<String>, family: impl Into<String>) -> Self {
        EntryPredicate::PatientName {
            given: given.into(),
            family: family.into(),
        }
    }

    pub fn matches_entry(&self, resource: &Resource, policy: MatchPolicy) -> bool {
        match (self, resource) {
            (EntryPredicate::Marker { label, value }, Resource::Marker(marker)) => {
                marker.label == *label && policy.value_eq(*label, &marker.value, value)
            }
            (EntryPredicate::PatientName { given, family }, Resource::Identity(identity)) => {
                let given_matches = identity
                    .first_given()
                    .is_some_and(|g| policy.text_eq(g, given));
                let family_matches = identity
                    .family
                    .as_deref()
                    .is_some_and(|f| policy.text_eq(f, family));
                given_matches && family_matches
            }
            _ => false,
        }
    }

    /// Secondary index key for this predicate, when it can be answered by the marker index.
    pub(crate) fn index_key(&self) -> Option<(MarkerLabel, String)> {
        match self {
            EntryPredicate::Marker { label, value } => Some((*label, index_value(value))),
            EntryPredicate::PatientName { .. } => None,
        }
    }
}

/// Normalised form of a marker value used as a secondary index key.
///
/// Text is lowercased so one index serves both match policies; the index only narrows
/// candidates and [`BundleFilter::matches`] makes the final decision.
pub(crate) fn index_value(value: &MarkerValue) -> String {
    match value {
        MarkerValue::Text(text) => text.to_lowercase(),
        MarkerValue::Integer(integer) => integer.to_string(),
    }
}

impl fmt::Display for EntryPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPredicate::Marker { label, value } => write!(f, "{label} = '{value}'"),
            EntryPredicate::PatientName { given, family } => {
                write!(f, "patient name = '{given} {family}'")
            }
        }
    }
}

/// Conjunction of entry predicates evaluated under a match policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleFilter {
    predicates: Vec<EntryPredicate>,
    policy: MatchPolicy,
}

impl BundleFilter {
    /// A filter with no predicates; it matches every bundle.
    pub fn new(policy: MatchPolicy) -> Self {
        Self {
            predicates: Vec::new(),
            policy,
        }
    }

    pub fn marker(label: MarkerLabel, value: impl Into<MarkerValue>, policy: MatchPolicy) -> Self {
        Self::new(policy).with(EntryPredicate::marker(label, value))
    }

    pub fn with(mut self, predicate: EntryPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(&self) -> &[EntryPredicate] {
        &self.predicates
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// True when every predicate is satisfied by at least one entry of `bundle`.
    pub fn matches(&self, bundle: &Bundle) -> bool {
        self.predicates.iter().all(|predicate| {
            bundle
                .entries
                .iter()
                .any(|entry| predicate.matches_entry(entry, self.policy))
        })
    }

    /// Human-readable description used in `NotFound` errors.
    pub fn describe(&self) -> String {
        if self.predicates.is_empty() {
            return "any bundle".to_string();
        }
        self.predicates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// Finds the first bundle in `collection` carrying the marker `(label, value)`.
pub fn find_bundle_by_marker(
    store: &dyn BundleStore,
    collection: Collection,
    label: MarkerLabel,
    value: impl Into<MarkerValue>,
    policy: MatchPolicy,
) -> StoreResult<Option<StoredBundle>> {
    let filter = BundleFilter::marker(label, value, policy);
    tracing::debug!(%collection, query = %filter.describe(), "find_bundle_by_marker");
    store.find_one(collection, &filter)
}

/// Finds every bundle in `collection` carrying the marker `(label, value)`, in insertion order.
pub fn find_bundles_by_marker(
    store: &dyn BundleStore,
    collection: Collection,
    label: MarkerLabel,
    value: impl Into<MarkerValue>,
    policy: MatchPolicy,
) -> StoreResult<Vec<StoredBundle>> {
    let filter = BundleFilter::marker(label, value, policy);
    tracing::debug!(%collection, query = %filter.describe(), "find_bundles_by_marker");
    store.find_many(collection, &filter)
}

/// Finds the first bundle in `collection` satisfying all `predicates`.
pub fn find_bundle_by_compound_markers(
    store: &dyn BundleStore,
    collection: Collection,
    predicates: impl IntoIterator<Item = EntryPredicate>,
    policy: MatchPolicy,
) -> StoreResult<Option<StoredBundle>> {
    let filter = predicates
        .into_iter()
        .fold(BundleFilter::new(policy), BundleFilter::with);
    tracing::debug!(%collection, query = %filter.describe(), "find_bundle_by_compound_markers");
    store.find_one(collection, &filter)
}
