//! Coverage accounting between scanned candidates and the event catalog.
//!
//! Builds a subject → locations map from publish/subscribe candidates so a
//! reviewer can see which discovered subjects the catalog already records
//! and which still need an entry.

use crate::catalog::CatalogStore;
use crate::scanner::CandidateRecord;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
/// Whether a subject is cataloged plus where the scanner saw it.
pub struct SubjectCoverage {
    pub cataloged: bool,
    pub locations: Vec<String>,
}

/// Map every candidate subject to its catalog status.
///
/// Only publish and subscribe candidates carry subjects. Locations are
/// deduplicated and sorted for deterministic output.
pub fn build_subject_coverage(
    candidates: &[CandidateRecord],
    store: &CatalogStore,
) -> BTreeMap<String, SubjectCoverage> {
    let known: BTreeSet<&str> = store.items().iter().filter_map(|item| item.messaging_subject()).collect();

    let mut map: BTreeMap<String, SubjectCoverage> = BTreeMap::new();
    for candidate in candidates.iter().filter(|c| c.kind.carries_subject()) {
        let entry = map
            .entry(candidate.value.clone())
            .or_insert_with(|| SubjectCoverage {
                cataloged: known.contains(candidate.value.as_str()),
                locations: Vec::new(),
            });
        let location = candidate.location();
        if !entry.locations.contains(&location) {
            entry.locations.push(location);
            entry.locations.sort();
        }
    }
    map
}

/// Subjects seen in code that no catalog item records.
pub fn uncataloged(coverage: &BTreeMap<String, SubjectCoverage>) -> Vec<&str> {
    coverage
        .iter()
        .filter(|(_, entry)| !entry.cataloged)
        .map(|(subject, _)| subject.as_str())
        .collect()
}
