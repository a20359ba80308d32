//! Density-based clustering with an explicit noise label.
//!
//! Rows in sparse regions receive the noise label instead of being forced
//! into a cluster. The neighborhood radius is derived from the data itself
//! (median k-distance), so callers only choose the density and size floors.

use std::collections::{BTreeMap, VecDeque};

use nalgebra::DMatrix;

use crate::cluster::pairwise_distances;
use crate::constants::{DEFAULT_MIN_SAMPLES, MIN_CLUSTER_SIZE_BASE};
use crate::types::{Label, NOISE};

/// Tuning knobs for [`density_cluster`].
#[derive(Debug, Clone)]
pub struct DensityConfig {
    /// Clusters smaller than this are demoted to noise wholesale.
    pub min_cluster_size: usize,
    /// Neighbors (self included) required within the radius for a row to
    /// seed or extend a cluster.
    pub min_samples: usize,
    /// When false, a single cluster that swallows every row is rejected
    /// and the whole labeling becomes noise.
    pub allow_single_cluster: bool,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: MIN_CLUSTER_SIZE_BASE,
            min_samples: DEFAULT_MIN_SAMPLES,
            allow_single_cluster: true,
        }
    }
}

/// Cluster rows by density, labeling sparse rows [`NOISE`].
///
/// The neighborhood radius is the median over rows of the distance to the
/// `min_samples`-th nearest neighbor. Expansion proceeds in row order from
/// each unclaimed core row, so the result is deterministic and surviving
/// cluster labels are compacted to `0, 1, ...` in order of first
/// appearance.
pub fn density_cluster(points: &DMatrix<f64>, config: &DensityConfig) -> Vec<Label> {
    let n = points.nrows();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![NOISE];
    }

    let distances = pairwise_distances(points);
    let k = config.min_samples.min(n - 1).max(1);

    // Distance from each row to its k-th nearest neighbor.
    let mut kth = Vec::with_capacity(n);
    for i in 0..n {
        let mut row: Vec<f64> = (0..n)
            .filter(|&j| j != i)
            .map(|j| distances[(i, j)])
            .collect();
        row.sort_by(|a, b| a.total_cmp(b));
        kth.push(row[k - 1]);
    }
    let mut sorted_kth = kth;
    sorted_kth.sort_by(|a, b| a.total_cmp(b));
    let eps = sorted_kth[n / 2];
    // Duplicate-heavy data can give a zero radius; duplicates must still
    // count as neighbors of each other.
    let eps = if eps > 0.0 { eps } else { 1e-12 };

    let neighbors: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| j != i && distances[(i, j)] <= eps)
                .collect()
        })
        .collect();
    let core: Vec<bool> = neighbors
        .iter()
        .map(|nbrs| nbrs.len() + 1 >= config.min_samples)
        .collect();

    // Breadth-first expansion from each unclaimed core row.
    let mut labels = vec![NOISE; n];
    let mut visited = vec![false; n];
    let mut next_label: Label = 0;
    for start in 0..n {
        if visited[start] || !core[start] {
            continue;
        }
        visited[start] = true;
        labels[start] = next_label;
        let mut queue = VecDeque::from([start]);
        while let Some(row) = queue.pop_front() {
            for &other in &neighbors[row] {
                if labels[other] == NOISE {
                    labels[other] = next_label;
                }
                if !visited[other] {
                    visited[other] = true;
                    if core[other] {
                        queue.push_back(other);
                    }
                }
            }
        }
        next_label += 1;
    }

    // Undersized clusters are demoted wholesale.
    let mut sizes: BTreeMap<Label, usize> = BTreeMap::new();
    for &label in &labels {
        if label != NOISE {
            *sizes.entry(label).or_insert(0) += 1;
        }
    }
    for label in labels.iter_mut() {
        if *label != NOISE && sizes[label] < config.min_cluster_size {
            *label = NOISE;
        }
    }

    // Compact surviving labels in order of first appearance.
    let mut remap: BTreeMap<Label, Label> = BTreeMap::new();
    let mut next_compact: Label = 0;
    for label in labels.iter_mut() {
        if *label == NOISE {
            continue;
        }
        let mapped = match remap.get(label) {
            Some(&m) => m,
            None => {
                let m = next_compact;
                remap.insert(*label, m);
                next_compact += 1;
                m
            }
        };
        *label = mapped;
    }

    if !config.allow_single_cluster
        && next_compact == 1
        && labels.iter().all(|&l| l != NOISE)
    {
        return vec![NOISE; n];
    }

    labels
}
