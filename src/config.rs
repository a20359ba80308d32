//! Configuration for refinement runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BOOTSTRAP_ITERATIONS, DEFAULT_EMBED_ITERATIONS, DEFAULT_EMBED_NEIGHBORS,
    DEFAULT_KERNEL_GAMMA, DEFAULT_MIN_SAMPLES, DEFAULT_PAIR_DECAY, DEFAULT_ROUNDS,
    DEFAULT_SAMPLE_BUDGET, DEFAULT_SEED, DEFAULT_SIGNIFICANCE, MIN_CLUSTER_SIZE_BASE,
    MIN_CLUSTER_SIZE_STEP,
};
use crate::types::PartitionStrategy;

/// Configuration options for `LeakProbe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Terminal round index; the run covers rounds `0..=rounds` (default: 10).
    pub rounds: usize,

    /// Per-round sample budget the resampler fills (default: 3,000).
    pub sample_budget: usize,

    /// Significance level of the distinguishability test (default: 0.05).
    pub significance: f64,

    /// Bootstrap resamples behind each null threshold (default: 1,000).
    pub bootstrap_iterations: usize,

    /// RBF kernel bandwidth for the MMD statistic (default: 1.0).
    pub kernel_gamma: f64,

    /// Project features to the plane before clustering (default: true).
    ///
    /// When disabled, clustering and boundary selection run directly on the
    /// normalized feature space.
    pub embedding: bool,

    /// High-space neighbors the embedding preserves (default: 10).
    pub embed_neighbors: usize,

    /// Refinement sweeps of the embedding (default: 200).
    pub embed_iterations: usize,

    /// Clustering variant for every round past round 0 (default: density).
    pub partition: PartitionStrategy,

    /// Density clustering size floor at round 0 (default: 5).
    pub min_cluster_base: usize,

    /// Per-round increment of the density size floor (default: 10).
    pub min_cluster_step: usize,

    /// Density required to seed or extend a cluster (default: 10).
    pub min_samples: usize,

    /// Accept a partition where one cluster swallows every row (default:
    /// true). When false such a partition is demoted to all-noise.
    pub allow_single_cluster: bool,

    /// Geometric decay of the boundary-pair quota across rounds
    /// (default: 0.481).
    pub pair_decay: f64,

    /// Skip the distinguishability test and its plot on non-terminal rounds
    /// (default: false). The terminal round always runs the full test.
    pub fast: bool,

    /// Master seed every random stream derives from (default: 42).
    pub seed: u64,

    /// Directory for per-round artifacts; `None` keeps the run in memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_root: Option<PathBuf>,

    /// Stop after this round even if `rounds` is larger. Mainly for
    /// inspecting a run midway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_after: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            sample_budget: DEFAULT_SAMPLE_BUDGET,
            significance: DEFAULT_SIGNIFICANCE,
            bootstrap_iterations: DEFAULT_BOOTSTRAP_ITERATIONS,
            kernel_gamma: DEFAULT_KERNEL_GAMMA,
            embedding: true,
            embed_neighbors: DEFAULT_EMBED_NEIGHBORS,
            embed_iterations: DEFAULT_EMBED_ITERATIONS,
            partition: PartitionStrategy::Density,
            min_cluster_base: MIN_CLUSTER_SIZE_BASE,
            min_cluster_step: MIN_CLUSTER_SIZE_STEP,
            min_samples: DEFAULT_MIN_SAMPLES,
            allow_single_cluster: true,
            pair_decay: DEFAULT_PAIR_DECAY,
            fast: false,
            seed: DEFAULT_SEED,
            artifact_root: None,
            stop_after: None,
        }
    }
}

impl Config {
    /// Density size floor for a given round: base plus step per round.
    pub fn min_cluster_size(&self, round: usize) -> usize {
        self.min_cluster_base + self.min_cluster_step * round
    }

    /// The last round this configuration will run.
    pub fn terminal_round(&self) -> usize {
        match self.stop_after {
            Some(stop) => stop.min(self.rounds),
            None => self.rounds,
        }
    }
}
