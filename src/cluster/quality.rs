//! Partition quality via the mean silhouette coefficient.

use std::collections::BTreeMap;

use nalgebra::DMatrix;

use crate::cluster::pairwise_distances;
use crate::types::Label;

/// Mean silhouette coefficient of a labeling, in `[-1, 1]`.
///
/// Every label forms a group of its own here, noise included, mirroring how
/// the partition is consumed downstream. Rows in singleton groups
/// contribute a coefficient of zero. Returns `None` when the score is
/// undefined: fewer than two rows, or fewer than two distinct labels.
///
/// # Panics
///
/// Panics if `points` and `labels` disagree on the number of rows.
pub fn silhouette_score(points: &DMatrix<f64>, labels: &[Label]) -> Option<f64> {
    let n = points.nrows();
    assert_eq!(n, labels.len(), "each row needs a label");
    if n < 2 {
        return None;
    }

    let mut groups: BTreeMap<Label, Vec<usize>> = BTreeMap::new();
    for (row, &label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(row);
    }
    if groups.len() < 2 {
        return None;
    }

    let distances = pairwise_distances(points);
    let mut total = 0.0;
    for i in 0..n {
        let own = &groups[&labels[i]];
        if own.len() == 1 {
            // Singleton rows contribute zero.
            continue;
        }

        let a = own
            .iter()
            .filter(|&&j| j != i)
            .map(|&j| distances[(i, j)])
            .sum::<f64>()
            / (own.len() - 1) as f64;

        let mut b = f64::INFINITY;
        for (label, rows) in &groups {
            if *label == labels[i] {
                continue;
            }
            let mean =
                rows.iter().map(|&j| distances[(i, j)]).sum::<f64>() / rows.len() as f64;
            if mean < b {
                b = mean;
            }
        }

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    Some(total / n as f64)
}
