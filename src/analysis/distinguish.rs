//! MMD two-sample test between a round's two dominant clusters.

use nalgebra::DMatrix;

use crate::result::{DistinguishabilityReport, Verdict};
use crate::statistics::{mmd_null_distribution, mmd_statistic, NullDistribution};
use crate::types::{Label, NOISE};

/// Parameters of one distinguishability test.
#[derive(Debug, Clone)]
pub struct DistinguishConfig {
    /// RBF kernel bandwidth.
    pub kernel_gamma: f64,
    /// Significance level of the decision threshold.
    pub significance: f64,
    /// Bootstrap resamples behind the null distribution.
    pub bootstrap_iterations: usize,
    /// Base seed for the bootstrap's counter-derived RNG streams.
    pub base_seed: u64,
}

/// Test report plus the null distribution that produced the threshold.
#[derive(Debug, Clone)]
pub struct DistinguishOutcome {
    /// The decision and its inputs.
    pub report: DistinguishabilityReport,
    /// Bootstrap null, present whenever a comparison ran. Kept so callers
    /// can render the observed-vs-null histogram.
    pub null: Option<NullDistribution>,
}

/// Compare the two most populous non-noise clusters.
///
/// Rows are taken from `features` (normalized feature space, not the planar
/// embedding). Clusters are ranked by row count, ties broken by the smaller
/// label. With fewer than two non-noise clusters the outcome is
/// [`Verdict::CannotTest`] and no null is computed.
pub fn run_distinguishability(
    features: &DMatrix<f64>,
    labels: &[Label],
    config: &DistinguishConfig,
) -> DistinguishOutcome {
    assert_eq!(features.nrows(), labels.len(), "each row needs a label");

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
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    if counts.len() < 2 {
        return DistinguishOutcome {
            report: DistinguishabilityReport::cannot_test(
                config.significance,
                config.bootstrap_iterations,
            ),
            null: None,
        };
    }

    let (label_a, label_b) = (counts[0].0, counts[1].0);
    let trues = rows_with_label(features, labels, label_a);
    let falses = rows_with_label(features, labels, label_b);

    let observed = mmd_statistic(&trues, &falses, config.kernel_gamma);
    let null = mmd_null_distribution(
        &trues,
        &falses,
        config.kernel_gamma,
        config.significance,
        config.bootstrap_iterations,
        config.base_seed,
    );

    let verdict = if observed < null.threshold { Verdict::Similar } else { Verdict::Different };
    let report = DistinguishabilityReport {
        verdict,
        cluster_pair: Some((label_a, label_b)),
        population_sizes: Some((trues.nrows(), falses.nrows())),
        observed_mmd: Some(observed),
        threshold: Some(null.threshold),
        significance: config.significance,
        bootstrap_iterations: config.bootstrap_iterations,
    };

    DistinguishOutcome { report, null: Some(null) }
}

fn rows_with_label(features: &DMatrix<f64>, labels: &[Label], target: Label) -> DMatrix<f64> {
    let picked: Vec<usize> =
        (0..labels.len()).filter(|&r| labels[r] == target).collect();
    let mut out = DMatrix::zeros(picked.len(), features.ncols());
    for (i, &row) in picked.iter().enumerate() {
        for c in 0..features.ncols() {
            out[(i, c)] = features[(row, c)];
        }
    }
    out
}
