//! Collapse of clusters that a single identity spans.
//!
//! Repeated measurements of one identity sometimes land in several small
//! clusters. A cluster whose members all carry one identity estimates
//! nothing but that identity, so when two or more such clusters point at
//! the same identity they are collapsed into one. Identity is ground truth
//! for "same underlying input"; the cluster label is only an estimate.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{Label, NOISE};

/// Merge clusters that are pure for a single identity.
///
/// A non-noise label is pure when every row carrying it shares one
/// identity. For each identity that owns two or more pure labels, all of
/// them are rewritten to the smallest. Mixed clusters and noise rows are
/// untouched, including rows of the same identity that sit in a mixed
/// cluster.
///
/// The rewrite depends only on the input partition, so applying the merge
/// twice changes nothing.
///
/// # Panics
///
/// Panics if `identities` and `labels` have different lengths.
pub fn merge_identity_clusters(identities: &[String], labels: &[Label]) -> Vec<Label> {
    assert_eq!(
        identities.len(),
        labels.len(),
        "each row needs exactly one identity and one label"
    );

    // Identities present in each non-noise cluster.
    let mut members: BTreeMap<Label, BTreeSet<&str>> = BTreeMap::new();
    for (identity, &label) in identities.iter().zip(labels.iter()) {
        if label != NOISE {
            members.entry(label).or_default().insert(identity.as_str());
        }
    }

    // Pure labels grouped by their single identity, ascending per identity.
    let mut pure: BTreeMap<&str, Vec<Label>> = BTreeMap::new();
    for (label, ids) in &members {
        if ids.len() == 1 {
            if let Some(identity) = ids.iter().next() {
                pure.entry(identity).or_default().push(*label);
            }
        }
    }

    let mut rewrite: BTreeMap<Label, Label> = BTreeMap::new();
    for labels_of_identity in pure.values() {
        if labels_of_identity.len() < 2 {
            continue;
        }
        let target = labels_of_identity[0];
        for &label in labels_of_identity {
            rewrite.insert(label, target);
        }
    }

    labels
        .iter()
        .map(|label| rewrite.get(label).copied().unwrap_or(*label))
        .collect()
}
