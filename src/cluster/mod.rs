//! Partitioning of embedded samples and partition post-processing.
//!
//! This module provides:
//! - Density-based clustering with a noise label ([`density_cluster`])
//! - Fixed-k clustering into exactly two groups ([`two_means`])
//! - Collapse of clusters that a single identity spans ([`merge_identity_clusters`])
//! - Silhouette-based partition quality ([`silhouette_score`])

mod density;
mod kmeans;
mod merge;
mod quality;

pub use density::{density_cluster, DensityConfig};
pub use kmeans::two_means;
pub use merge::merge_identity_clusters;
pub use quality::silhouette_score;

use std::collections::BTreeMap;

use nalgebra::DMatrix;

use crate::types::{Label, NOISE};

/// Count rows per label, noise included.
pub fn cluster_sizes(labels: &[Label]) -> BTreeMap<Label, usize> {
    let mut sizes = BTreeMap::new();
    for &label in labels {
        *sizes.entry(label).or_insert(0) += 1;
    }
    sizes
}

/// Number of distinct non-noise labels in a labeling.
pub fn non_noise_clusters(labels: &[Label]) -> usize {
    let mut distinct: Vec<Label> = labels.iter().copied().filter(|&l| l != NOISE).collect();
    distinct.sort_unstable();
    distinct.dedup();
    distinct.len()
}

/// Dense Euclidean distance matrix between all row pairs.
pub(crate) fn pairwise_distances(points: &DMatrix<f64>) -> DMatrix<f64> {
    let n = points.nrows();
    let width = points.ncols();
    let mut distances = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            let mut sum = 0.0;
            for c in 0..width {
                let diff = points[(i, c)] - points[(j, c)];
                sum += diff * diff;
            }
            let d = sum.sqrt();
            distances[(i, j)] = d;
            distances[(j, i)] = d;
        }
    }
    distances
}
