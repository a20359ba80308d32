//! Fixed-k partitioning into exactly two clusters.

use nalgebra::DMatrix;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::types::Label;

const MAX_LLOYD_ITERATIONS: usize = 100;

/// Partition rows into exactly two clusters with Lloyd's algorithm.
///
/// Centroids are seeded k-means++ style: the first uniformly at random,
/// the second weighted by squared distance from the first. Every row is
/// always assigned somewhere, so this variant never produces noise.
/// Labels are `0` and `1`; which group gets which label depends on the
/// seeded initialization, not on any ordering of the data.
///
/// Fewer than two rows yields the trivial labeling.
pub fn two_means(points: &DMatrix<f64>, seed: u64) -> Vec<Label> {
    let n = points.nrows();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![0];
    }

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    // k-means++ seeding for k = 2.
    let first = rng.random_range(0..n);
    let weights: Vec<f64> = (0..n).map(|i| squared_distance(points, i, first)).collect();
    let total: f64 = weights.iter().sum();
    let second = if total > 0.0 {
        let mut draw = rng.random::<f64>() * total;
        let mut pick = n - 1;
        for (i, w) in weights.iter().enumerate() {
            if draw < *w {
                pick = i;
                break;
            }
            draw -= *w;
        }
        pick
    } else {
        // All rows coincide; any distinct index will do.
        (first + 1) % n
    };

    let mut centroids = [row_vec(points, first), row_vec(points, second)];
    let mut labels = vec![0 as Label; n];

    for _ in 0..MAX_LLOYD_ITERATIONS {
        let mut changed = false;
        for i in 0..n {
            let d0 = squared_distance_to(points, i, &centroids[0]);
            let d1 = squared_distance_to(points, i, &centroids[1]);
            let assignment = if d0 <= d1 { 0 } else { 1 };
            if labels[i] != assignment {
                labels[i] = assignment;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        for (k, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<usize> =
                (0..n).filter(|&i| labels[i] == k as Label).collect();
            if members.is_empty() {
                // Keep the previous centroid so the cluster can reclaim rows.
                continue;
            }
            for (c, slot) in centroid.iter_mut().enumerate() {
                *slot = members.iter().map(|&i| points[(i, c)]).sum::<f64>()
                    / members.len() as f64;
            }
        }
    }

    labels
}

fn row_vec(points: &DMatrix<f64>, row: usize) -> Vec<f64> {
    (0..points.ncols()).map(|c| points[(row, c)]).collect()
}

fn squared_distance(points: &DMatrix<f64>, a: usize, b: usize) -> f64 {
    let mut sum = 0.0;
    for c in 0..points.ncols() {
        let diff = points[(a, c)] - points[(b, c)];
        sum += diff * diff;
    }
    sum
}

fn squared_distance_to(points: &DMatrix<f64>, row: usize, centroid: &[f64]) -> f64 {
    let mut sum = 0.0;
    for (c, value) in centroid.iter().enumerate() {
        let diff = points[(row, c)] - value;
        sum += diff * diff;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> DMatrix<f64> {
        let mut rows = Vec::new();
        for i in 0..10 {
            rows.push(0.0 + (i as f64) * 0.01);
            rows.push(0.0 - (i as f64) * 0.01);
        }
        for i in 0..10 {
            rows.push(10.0 + (i as f64) * 0.01);
            rows.push(10.0 - (i as f64) * 0.01);
        }
        DMatrix::from_row_slice(20, 2, &rows)
    }

    #[test]
    fn separates_two_obvious_blobs() {
        let labels = two_means(&two_blobs(), 42);
        let first = labels[0];
        assert!(labels[..10].iter().all(|&l| l == first), "first blob should be one cluster");
        assert!(labels[10..].iter().all(|&l| l != first), "second blob should be the other");
    }

    #[test]
    fn always_uses_both_labels_on_distinct_data() {
        let labels = two_means(&two_blobs(), 7);
        assert!(labels.contains(&0) && labels.contains(&1));
        assert!(labels.iter().all(|&l| l == 0 || l == 1));
    }

    #[test]
    fn deterministic_for_a_seed() {
        let points = two_blobs();
        assert_eq!(two_means(&points, 3), two_means(&points, 3));
    }

    #[test]
    fn handles_degenerate_inputs() {
        let empty = DMatrix::<f64>::zeros(0, 2);
        assert!(two_means(&empty, 1).is_empty());

        let single = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        assert_eq!(two_means(&single, 1), vec![0]);

        let identical = DMatrix::from_row_slice(4, 2, &[5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0]);
        let labels = two_means(&identical, 1);
        assert_eq!(labels.len(), 4);
    }
}
