//! Agreement between two partitions of the same rows.
//!
//! Both scores are computed by pair counting over the contingency table of
//! the two labelings. Noise labels participate like any other category, so a
//! row moving in or out of noise counts as disagreement.

use std::collections::BTreeMap;

use crate::types::Label;

/// Number of unordered pairs among `n` items.
fn comb2(n: usize) -> f64 {
    (n as f64) * (n.saturating_sub(1) as f64) / 2.0
}

/// Contingency table of label co-occurrence plus per-side marginals.
fn contingency(a: &[Label], b: &[Label]) -> (BTreeMap<(Label, Label), usize>, BTreeMap<Label, usize>, BTreeMap<Label, usize>) {
    let mut cells: BTreeMap<(Label, Label), usize> = BTreeMap::new();
    let mut rows: BTreeMap<Label, usize> = BTreeMap::new();
    let mut cols: BTreeMap<Label, usize> = BTreeMap::new();
    for (&la, &lb) in a.iter().zip(b.iter()) {
        *cells.entry((la, lb)).or_insert(0) += 1;
        *rows.entry(la).or_insert(0) += 1;
        *cols.entry(lb).or_insert(0) += 1;
    }
    (cells, rows, cols)
}

/// Rand index between two labelings, in `[0, 1]`.
///
/// Fraction of row pairs on which the labelings agree, whether by grouping
/// the pair together in both or separating it in both. Fewer than two rows
/// yields 1.0, since there are no pairs to disagree on.
///
/// # Panics
///
/// Panics if the labelings have different lengths.
pub fn rand_index(a: &[Label], b: &[Label]) -> f64 {
    assert_eq!(a.len(), b.len(), "labelings must cover the same rows");
    let n = a.len();
    if n < 2 {
        return 1.0;
    }

    let (cells, rows, cols) = contingency(a, b);
    let total_pairs = comb2(n);
    let sum_cells: f64 = cells.values().map(|&c| comb2(c)).sum();
    let sum_rows: f64 = rows.values().map(|&c| comb2(c)).sum();
    let sum_cols: f64 = cols.values().map(|&c| comb2(c)).sum();

    // Agreements = pairs together in both + pairs apart in both.
    (total_pairs - sum_rows - sum_cols + 2.0 * sum_cells) / total_pairs
}

/// Adjusted Rand index between two labelings.
///
/// The Rand index corrected for chance: 1.0 for identical partitions,
/// near 0.0 for independent ones, and negative when agreement falls below
/// the chance level. Fewer than two rows yields 1.0.
///
/// # Panics
///
/// Panics if the labelings have different lengths.
pub fn adjusted_rand_index(a: &[Label], b: &[Label]) -> f64 {
    assert_eq!(a.len(), b.len(), "labelings must cover the same rows");
    let n = a.len();
    if n < 2 {
        return 1.0;
    }

    let (cells, rows, cols) = contingency(a, b);
    let total_pairs = comb2(n);
    let sum_cells: f64 = cells.values().map(|&c| comb2(c)).sum();
    let sum_rows: f64 = rows.values().map(|&c| comb2(c)).sum();
    let sum_cols: f64 = cols.values().map(|&c| comb2(c)).sum();

    let expected = sum_rows * sum_cols / total_pairs;
    let max_index = 0.5 * (sum_rows + sum_cols);
    let numerator = sum_cells - expected;
    let denominator = max_index - expected;

    if denominator.abs() < 1e-12 {
        // Both partitions are trivial (all-singletons or one block each);
        // they either agree exactly or cannot be scored above chance.
        if numerator.abs() < 1e-12 {
            1.0
        } else {
            0.0
        }
    } else {
        numerator / denominator
    }
}
