//! Pooled bootstrap estimation of the MMD null distribution.
//!
//! Under the null hypothesis the two cluster populations come from one
//! distribution, so their rows are pooled and repeatedly resampled into
//! pseudo-populations of the original sizes. The MMD of each resample forms
//! the null distribution; its upper quantile is the decision threshold.

use nalgebra::DMatrix;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::statistics::mmd_statistic;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Counter-based RNG seed derivation using SplitMix64.
///
/// A stateless PRF from (base seed, counter) to a well-distributed 64-bit
/// seed. Each bootstrap iteration seeds its own RNG from its index, so the
/// null distribution is identical whether iterations run serially or in
/// parallel.
#[inline]
pub fn counter_rng_seed(base_seed: u64, counter: u64) -> u64 {
    // SplitMix64: https://xoshiro.di.unimi.it/splitmix64.c
    let mut z = base_seed.wrapping_add(counter.wrapping_mul(0x9e37_79b9_7f4a_7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Bootstrap null distribution of the MMD statistic.
#[derive(Debug, Clone)]
pub struct NullDistribution {
    /// Null statistics, sorted ascending.
    pub stats: Vec<f64>,
    /// The (1 − significance) empirical quantile of `stats`.
    pub threshold: f64,
    /// Significance level the threshold was taken at.
    pub significance: f64,
}

/// Estimate the MMD null distribution by pooled resampling.
///
/// Stacks the rows of `x` and `y`, then for each of `iterations` draws
/// `|x| + |y|` pooled rows with replacement, assigns the first `|x|` to a
/// pseudo-x and the rest to a pseudo-y, and records their MMD. The
/// threshold is the (1 − `significance`) quantile of the recorded values.
///
/// Deterministic for a fixed `base_seed` regardless of the `parallel`
/// feature: iteration `i` always uses a fresh RNG seeded from
/// [`counter_rng_seed`]`(base_seed, i)`.
///
/// # Panics
///
/// Panics if the two matrices have different column counts, if either
/// population is empty, or if `iterations` is zero.
pub fn mmd_null_distribution(
    x: &DMatrix<f64>,
    y: &DMatrix<f64>,
    gamma: f64,
    significance: f64,
    iterations: usize,
    base_seed: u64,
) -> NullDistribution {
    assert_eq!(
        x.ncols(),
        y.ncols(),
        "both populations must share one feature schema"
    );
    assert!(x.nrows() > 0 && y.nrows() > 0, "both populations must be non-empty");
    assert!(iterations > 0, "bootstrap needs at least one iteration");

    let n_x = x.nrows();
    let n_y = y.nrows();
    let width = x.ncols();

    // Pool both populations under the null hypothesis.
    let mut pooled = DMatrix::zeros(n_x + n_y, width);
    for i in 0..n_x {
        for c in 0..width {
            pooled[(i, c)] = x[(i, c)];
        }
    }
    for i in 0..n_y {
        for c in 0..width {
            pooled[(n_x + i, c)] = y[(i, c)];
        }
    }

    #[cfg(feature = "parallel")]
    let stats: Vec<f64> = crate::thread_pool::install(|| {
        let mut out = vec![0.0_f64; iterations];
        out.par_iter_mut().enumerate().for_each(|(i, slot)| {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(base_seed, i as u64));
            *slot = null_statistic(&pooled, n_x, n_y, gamma, &mut rng);
        });
        out
    });

    #[cfg(not(feature = "parallel"))]
    let stats: Vec<f64> = (0..iterations)
        .map(|i| {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(base_seed, i as u64));
            null_statistic(&pooled, n_x, n_y, gamma, &mut rng)
        })
        .collect();

    let mut sorted = stats;
    sorted.sort_by(|a, b| a.total_cmp(b));

    let quantile = 1.0 - significance;
    let idx = ((iterations as f64) * quantile).ceil() as usize;
    let idx = idx.saturating_sub(1).min(iterations - 1);
    let threshold = sorted[idx];

    NullDistribution { stats: sorted, threshold, significance }
}

/// One pooled resample: draw pseudo-populations and return their MMD.
fn null_statistic<R: Rng>(
    pooled: &DMatrix<f64>,
    n_x: usize,
    n_y: usize,
    gamma: f64,
    rng: &mut R,
) -> f64 {
    let width = pooled.ncols();
    let total = pooled.nrows();
    let mut pseudo_x = DMatrix::zeros(n_x, width);
    let mut pseudo_y = DMatrix::zeros(n_y, width);

    for slot in 0..(n_x + n_y) {
        let pick = rng.random_range(0..total);
        if slot < n_x {
            for c in 0..width {
                pseudo_x[(slot, c)] = pooled[(pick, c)];
            }
        } else {
            for c in 0..width {
                pseudo_y[(slot - n_x, c)] = pooled[(pick, c)];
            }
        }
    }

    mmd_statistic(&pseudo_x, &pseudo_y, gamma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn gaussian_matrix(rows: usize, shift: f64, seed: u64) -> DMatrix<f64> {
        use rand_distr::{Distribution, Normal};
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let normal = Normal::new(shift, 1.0).unwrap();
        DMatrix::from_fn(rows, 2, |_, _| normal.sample(&mut rng))
    }

    #[test]
    fn counter_seed_is_stable_and_spreads() {
        assert_eq!(counter_rng_seed(42, 0), counter_rng_seed(42, 0));
        assert_ne!(counter_rng_seed(42, 0), counter_rng_seed(42, 1));
        assert_ne!(counter_rng_seed(42, 1), counter_rng_seed(43, 1));
    }

    #[test]
    fn null_distribution_is_deterministic_for_a_seed() {
        let x = gaussian_matrix(30, 0.0, 1);
        let y = gaussian_matrix(25, 0.0, 2);
        let a = mmd_null_distribution(&x, &y, 1.0, 0.05, 200, 7);
        let b = mmd_null_distribution(&x, &y, 1.0, 0.05, 200, 7);
        assert_eq!(a.stats, b.stats, "same seed must reproduce the null exactly");
        assert_eq!(a.threshold, b.threshold);
    }

    #[test]
    fn different_seeds_move_the_null() {
        let x = gaussian_matrix(30, 0.0, 1);
        let y = gaussian_matrix(25, 0.0, 2);
        let a = mmd_null_distribution(&x, &y, 1.0, 0.05, 100, 7);
        let b = mmd_null_distribution(&x, &y, 1.0, 0.05, 100, 8);
        assert_ne!(a.stats, b.stats);
    }

    #[test]
    fn threshold_sits_in_the_upper_tail() {
        let x = gaussian_matrix(40, 0.0, 3);
        let y = gaussian_matrix(40, 0.0, 4);
        let null = mmd_null_distribution(&x, &y, 1.0, 0.05, 500, 11);
        let below = null.stats.iter().filter(|s| **s <= null.threshold).count();
        let frac = below as f64 / null.stats.len() as f64;
        assert!(frac >= 0.94, "~95% of the null should sit at or below the threshold, got {}", frac);
    }

    #[test]
    fn separated_populations_exceed_their_null_threshold() {
        let x = gaussian_matrix(40, 0.0, 5);
        let y = gaussian_matrix(40, 6.0, 6);
        let observed = mmd_statistic(&x, &y, 1.0);
        let null = mmd_null_distribution(&x, &y, 1.0, 0.05, 300, 13);
        assert!(
            observed > null.threshold,
            "observed {} should clear threshold {}",
            observed,
            null.threshold
        );
    }

    #[test]
    fn stats_come_back_sorted() {
        let x = gaussian_matrix(20, 0.0, 9);
        let y = gaussian_matrix(20, 0.0, 10);
        let null = mmd_null_distribution(&x, &y, 1.0, 0.1, 150, 3);
        for pair in null.stats.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }
}
