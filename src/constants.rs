//! Protocol constants and configuration defaults.

use crate::types::Label;

/// Default terminal round index (rounds run 0..=N).
pub const DEFAULT_ROUNDS: usize = 10;

/// Default per-round sample budget.
///
/// Round 1 draws half of this per identity group; later rounds divide it
/// evenly across the surviving label groups.
pub const DEFAULT_SAMPLE_BUDGET: usize = 3000;

/// Default significance level for the distinguishability test.
pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;

/// Default bootstrap repeat count for the null threshold.
pub const DEFAULT_BOOTSTRAP_ITERATIONS: usize = 1000;

/// Default RBF kernel bandwidth parameter for the MMD statistic.
pub const DEFAULT_KERNEL_GAMMA: f64 = 1.0;

/// Default neighbor count for the 2-D embedding.
pub const DEFAULT_EMBED_NEIGHBORS: usize = 10;

/// Default gradient-refinement iteration count for the embedding.
pub const DEFAULT_EMBED_ITERATIONS: usize = 200;

/// Default initial learning rate for the embedding refinement.
pub const DEFAULT_EMBED_LEARNING_RATE: f64 = 0.1;

/// Default master RNG seed. All per-concern sub-seeds derive from it.
pub const DEFAULT_SEED: u64 = 42;

/// Base of the minimum-cluster-size schedule: `base + step * round`.
pub const MIN_CLUSTER_SIZE_BASE: usize = 5;

/// Per-round increment of the minimum-cluster-size schedule.
pub const MIN_CLUSTER_SIZE_STEP: usize = 10;

/// Default core-point threshold for density clustering.
pub const DEFAULT_MIN_SAMPLES: usize = 10;

/// Geometric decay factor for the boundary-pair count schedule.
///
/// Round r (r ≥ 2) requests `⌊budget · decay^r / 2⌋` pairs, floored at 1.
pub const DEFAULT_PAIR_DECAY: f64 = 0.481;

/// Label assigned to every sample of the round-0 population.
pub const ROUND_ZERO_LABEL: Label = 1;

/// Agreement-slope magnitude below which a trajectory counts as flat.
pub const TREND_SLOPE_TOLERANCE: f64 = 0.02;
