//! Greedy farthest-pair selection across a cluster boundary.
//!
//! Each round narrows the population to the identities that sit farthest
//! apart across the two target clusters. Selection is a repeated argmax
//! over the cross-cluster distance matrix with destructive removal: once a
//! pair is recorded, every row of both identities leaves both pools, so an
//! identity never backs more than one recorded pair.

use std::collections::BTreeSet;

use nalgebra::DMatrix;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::{Label, NOISE};

/// One recorded cross-cluster pair, named by identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryPair {
    /// Identity of the endpoint drawn from the first target cluster.
    pub first: String,
    /// Identity of the endpoint drawn from the second target cluster.
    pub second: String,
    /// Planar distance between the two endpoints at selection time.
    pub distance: f64,
}

/// Outcome of a boundary selection pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoundarySelection {
    /// Recorded pairs in selection order, farthest first.
    pub pairs: Vec<BoundaryPair>,
    /// Farthest-pair hits where both endpoints shared an identity and one
    /// endpoint was removed at random to retry.
    pub collisions_resolved: usize,
}

impl BoundarySelection {
    /// Identities referenced by the recorded pairs, in selection order.
    pub fn seed_identities(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut seeds = Vec::new();
        for pair in &self.pairs {
            for identity in [&pair.first, &pair.second] {
                if seen.insert(identity.clone()) {
                    seeds.push(identity.clone());
                }
            }
        }
        seeds
    }
}

/// Choose the two cluster labels to select across.
///
/// Candidate pairs are ranked by population (larger first, smaller label on
/// ties). The first pair whose identity sets do not overlap wins; when every
/// pair overlaps, the two most populous labels are used anyway. Noise is
/// never a candidate. Returns `None` when fewer than two non-noise labels
/// are present.
pub fn choose_target_labels(labels: &[Label], identities: &[String]) -> Option<(Label, Label)> {
    let mut counts: Vec<(Label, usize)> = Vec::new();
    for &label in labels {
        if label == NOISE {
            continue;
        }
        match counts.iter_mut().find(|(l, _)| *l == label) {
            Some((_, c)) => *c += 1,
            None => counts.push((label, 1)),
        }
    }
    if counts.len() < 2 {
        return None;
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let identity_set = |target: Label| -> BTreeSet<&str> {
        identities
            .iter()
            .zip(labels.iter())
            .filter(|(_, &l)| l == target)
            .map(|(id, _)| id.as_str())
            .collect()
    };

    for i in 0..counts.len() {
        for j in (i + 1)..counts.len() {
            let (a, b) = (counts[i].0, counts[j].0);
            if identity_set(a).is_disjoint(&identity_set(b)) {
                return Some((a, b));
            }
        }
    }

    // Every pair shares identities; fall back to the two most populous.
    Some((counts[0].0, counts[1].0))
}

/// Select up to `top_n` farthest cross-cluster pairs.
///
/// Pools are the rows labeled with each target. Each iteration scans all
/// remaining cross-pool pairs for the largest Euclidean distance. A hit
/// whose endpoints share an identity is degenerate: one endpoint, chosen
/// uniformly at random from `rng`, is dropped and the search retries
/// without consuming quota. A genuine hit is recorded and every row of
/// both identities leaves both pools. Selection stops at the quota or when
/// either pool runs dry.
///
/// # Panics
///
/// Panics if `points`, `identities`, and `labels` disagree on row count.
pub fn select_boundary_pairs(
    points: &DMatrix<f64>,
    identities: &[String],
    labels: &[Label],
    targets: (Label, Label),
    top_n: usize,
    rng: &mut impl Rng,
) -> BoundarySelection {
    assert_eq!(points.nrows(), labels.len(), "each row needs a label");
    assert_eq!(points.nrows(), identities.len(), "each row needs an identity");

    let mut selection = BoundarySelection::default();
    if targets.0 == targets.1 {
        return selection;
    }

    let mut pool_a: Vec<usize> = (0..labels.len()).filter(|&r| labels[r] == targets.0).collect();
    let mut pool_b: Vec<usize> = (0..labels.len()).filter(|&r| labels[r] == targets.1).collect();

    while selection.pairs.len() < top_n && !pool_a.is_empty() && !pool_b.is_empty() {
        // Global farthest pair across the remaining pools.
        let mut best = (0usize, 0usize, f64::NEG_INFINITY);
        for (ai, &row_a) in pool_a.iter().enumerate() {
            for (bi, &row_b) in pool_b.iter().enumerate() {
                let d = planar_distance(points, row_a, row_b);
                if d > best.2 {
                    best = (ai, bi, d);
                }
            }
        }

        let (ai, bi, distance) = best;
        let id_a = identities[pool_a[ai]].clone();
        let id_b = identities[pool_b[bi]].clone();

        if id_a == id_b {
            // Degenerate hit: the same identity cannot witness a boundary.
            selection.collisions_resolved += 1;
            if rng.random_range(0..2) == 0 {
                pool_a.remove(ai);
            } else {
                pool_b.remove(bi);
            }
            continue;
        }

        selection.pairs.push(BoundaryPair { first: id_a.clone(), second: id_b.clone(), distance });
        let spent = |row: &usize| {
            let identity = &identities[*row];
            *identity != id_a && *identity != id_b
        };
        pool_a.retain(spent);
        pool_b.retain(spent);
    }

    selection
}

fn planar_distance(points: &DMatrix<f64>, a: usize, b: usize) -> f64 {
    let mut sum = 0.0;
    for c in 0..points.ncols() {
        let diff = points[(a, c)] - points[(b, c)];
        sum += diff * diff;
    }
    sum.sqrt()
}
