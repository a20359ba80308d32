//! Round orchestrator: the iterative refine-and-test state machine.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::DMatrix;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::analysis::{assess_trajectory, run_distinguishability, DistinguishConfig};
use crate::artifacts::RoundStore;
use crate::cluster::{
    density_cluster, merge_identity_clusters, silhouette_score, two_means, DensityConfig,
};
use crate::config::Config;
use crate::constants::{DEFAULT_EMBED_LEARNING_RATE, ROUND_ZERO_LABEL};
use crate::embed::{embed, EmbedConfig};
use crate::error::{Error, Result};
use crate::output::render_null_histogram;
use crate::producer::RoundInputProducer;
use crate::result::{
    AgreementPoint, DistinguishabilityReport, PartitionSummary, RoundRecord, RunOutcome,
    RunReport,
};
use crate::sampling::{
    group_rows_by_label, pair_count_for_round, per_group_budget, stratified_resample,
    top_identity_groups,
};
use crate::select::{choose_target_labels, select_boundary_pairs};
use crate::statistics::{adjusted_rand_index, counter_rng_seed, rand_index, zscore_scale};
use crate::table::{FeatureTable, LabeledTable};
use crate::types::{Label, PartitionStrategy, NOISE};

// Stream salts keep the run's random consumers on disjoint seed counters.
const SAMPLING_STREAM: u64 = 0x01;
const SELECTION_STREAM: u64 = 0x02;
const EMBED_STREAM: u64 = 0x03;
const KMEANS_STREAM: u64 = 0x100;
const BOOTSTRAP_STREAM: u64 = 0x1000;

/// Iterative cluster-refinement and distinguishability-testing engine.
///
/// A `LeakProbe` drives rounds `0..=rounds` against a
/// [`RoundInputProducer`]: each round resamples the population toward the
/// cluster boundary, re-embeds, re-clusters, and records agreement with the
/// previous round; the terminal round's two dominant clusters get the full
/// MMD distinguishability test.
#[derive(Debug, Clone)]
pub struct LeakProbe {
    config: Config,
}

impl Default for LeakProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Carried from one round into the next.
struct RoundState {
    /// Normalized features with the round's merged labels.
    labeled: LabeledTable,
    /// Coordinates clustering and selection ran on.
    coords: DMatrix<f64>,
}

/// One round's input population plus bookkeeping about how it was built.
struct RoundInput {
    table: FeatureTable,
    /// Previous-round label carried onto each row, absent for round 0.
    prior: Option<Vec<Label>>,
    seed_pairs: usize,
    collision_retries: usize,
}

impl LeakProbe {
    /// Create a probe with default configuration.
    pub fn new() -> Self {
        Self { config: Config::default() }
    }

    /// Create a probe with reduced settings for fast exploratory runs:
    /// - 3 rounds past the initial population
    /// - 300-sample budget
    /// - 200 bootstrap iterations
    /// - 100 embedding sweeps
    /// - non-terminal distinguishability tests skipped
    pub fn quick() -> Self {
        Self {
            config: Config {
                rounds: 3,
                sample_budget: 300,
                bootstrap_iterations: 200,
                embed_iterations: 100,
                fast: true,
                ..Config::default()
            },
        }
    }

    /// Create a probe with heavier settings for publication-grade runs:
    /// - 5,000 bootstrap iterations
    /// - 500 embedding sweeps
    pub fn thorough() -> Self {
        Self {
            config: Config {
                bootstrap_iterations: 5_000,
                embed_iterations: 500,
                ..Config::default()
            },
        }
    }

    /// Create a probe from an explicit configuration.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Set the terminal round index.
    pub fn rounds(mut self, n: usize) -> Self {
        self.config.rounds = n;
        self
    }

    /// Set the per-round sample budget.
    pub fn sample_budget(mut self, n: usize) -> Self {
        self.config.sample_budget = n;
        self
    }

    /// Set the distinguishability significance level.
    pub fn significance(mut self, alpha: f64) -> Self {
        self.config.significance = alpha;
        self
    }

    /// Set bootstrap iterations for the null threshold.
    pub fn bootstrap_iterations(mut self, n: usize) -> Self {
        self.config.bootstrap_iterations = n;
        self
    }

    /// Set the RBF kernel bandwidth.
    pub fn kernel_gamma(mut self, gamma: f64) -> Self {
        self.config.kernel_gamma = gamma;
        self
    }

    /// Enable or disable the planar embedding stage.
    pub fn embedding(mut self, enabled: bool) -> Self {
        self.config.embedding = enabled;
        self
    }

    /// Set how many high-space neighbors the embedding preserves.
    pub fn embed_neighbors(mut self, n: usize) -> Self {
        self.config.embed_neighbors = n;
        self
    }

    /// Set the clustering variant used past round 0.
    pub fn partition_strategy(mut self, strategy: PartitionStrategy) -> Self {
        self.config.partition = strategy;
        self
    }

    /// Set the density size floor schedule: `base + step * round`.
    pub fn min_cluster_schedule(mut self, base: usize, step: usize) -> Self {
        self.config.min_cluster_base = base;
        self.config.min_cluster_step = step;
        self
    }

    /// Set the density required to seed or extend a cluster.
    pub fn min_samples(mut self, n: usize) -> Self {
        self.config.min_samples = n;
        self
    }

    /// Accept or reject partitions where one cluster swallows every row.
    pub fn allow_single_cluster(mut self, allow: bool) -> Self {
        self.config.allow_single_cluster = allow;
        self
    }

    /// Set the geometric decay of the boundary-pair quota.
    pub fn pair_decay(mut self, decay: f64) -> Self {
        self.config.pair_decay = decay;
        self
    }

    /// Skip non-terminal distinguishability tests and plots.
    pub fn fast(mut self, fast: bool) -> Self {
        self.config.fast = fast;
        self
    }

    /// Set the master seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Persist per-round artifacts under this directory.
    pub fn artifact_root(mut self, root: impl Into<std::path::PathBuf>) -> Self {
        self.config.artifact_root = Some(root.into());
        self
    }

    /// Stop after this round even if more are configured.
    pub fn stop_after(mut self, round: usize) -> Self {
        self.config.stop_after = Some(round);
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the refinement loop to completion.
    ///
    /// # Errors
    ///
    /// Returns an error when the producer fails, when a round's population
    /// is empty or has no numeric feature columns, when artifacts cannot be
    /// written, or when the terminal round's partition collapses below two
    /// clusters. A collapse on a non-terminal round is downgraded: the run
    /// halts early and reports [`RunOutcome::CollapsedEarly`].
    pub fn run(self, producer: &mut dyn RoundInputProducer) -> Result<RunReport> {
        let config = self.config;
        let store = config.artifact_root.as_ref().map(RoundStore::new);
        let terminal_round = config.terminal_round();

        let mut sampling_rng =
            Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(config.seed, SAMPLING_STREAM));
        let mut selection_rng =
            Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(config.seed, SELECTION_STREAM));

        let mut rounds: Vec<RoundRecord> = Vec::new();
        let mut agreement_points: Vec<AgreementPoint> = Vec::new();
        let mut previous: Option<RoundState> = None;
        let mut outcome = RunOutcome::Completed;

        for round in 0..=terminal_round {
            // Step 1: Build the round's input population.
            let input = match round {
                0 => RoundInput {
                    table: producer.produce(0, &[])?,
                    prior: None,
                    seed_pairs: 0,
                    collision_retries: 0,
                },
                1 => {
                    let prev = previous.as_ref().ok_or(Error::EmptyPopulation)?;
                    let seeds = top_identity_groups(prev.labeled.table.identities(), 2);
                    let produced = producer.produce(round, &seeds)?;

                    let mut groups = produced.rows_by_identity();
                    groups.retain(|identity, _| seeds.contains(identity));
                    if groups.values().all(Vec::is_empty) {
                        return Err(Error::EmptyPopulation);
                    }

                    let picked = stratified_resample(
                        &groups,
                        per_group_budget(config.sample_budget, 2),
                        &mut sampling_rng,
                    );
                    let table = produced.select_rows(&picked);
                    let map = identity_label_map(&prev.labeled);
                    let prior = carried_labels(&table, &map);
                    RoundInput { table, prior: Some(prior), seed_pairs: 0, collision_retries: 0 }
                }
                _ => {
                    let prev = previous.as_ref().ok_or(Error::EmptyPopulation)?;
                    let targets = match choose_target_labels(
                        &prev.labeled.labels,
                        prev.labeled.table.identities(),
                    ) {
                        Some(targets) => targets,
                        None => {
                            eprintln!(
                                "[leakprobe] round {}: no cluster pair left to select across; halting",
                                round
                            );
                            outcome = RunOutcome::CollapsedEarly { round };
                            break;
                        }
                    };

                    let quota =
                        pair_count_for_round(config.sample_budget, round, config.pair_decay);
                    let selection = select_boundary_pairs(
                        &prev.coords,
                        prev.labeled.table.identities(),
                        &prev.labeled.labels,
                        targets,
                        quota,
                        &mut selection_rng,
                    );
                    if selection.pairs.is_empty() {
                        eprintln!(
                            "[leakprobe] round {}: boundary selection returned no pairs; halting",
                            round
                        );
                        outcome = RunOutcome::CollapsedEarly { round };
                        break;
                    }
                    if let Some(store) = &store {
                        store.write_boundary_pairs(round, &selection.pairs)?;
                    }

                    let seeds = selection.seed_identities();
                    let produced = producer.produce(round, &seeds)?;
                    let keep: Vec<usize> = (0..produced.len())
                        .filter(|&r| seeds.contains(&produced.identities()[r]))
                        .collect();
                    if keep.is_empty() {
                        return Err(Error::EmptyPopulation);
                    }
                    let trimmed = produced.select_rows(&keep);

                    let map = identity_label_map(&prev.labeled);
                    let carried = carried_labels(&trimmed, &map);
                    let groups = group_rows_by_label(&carried);
                    let picked = stratified_resample(
                        &groups,
                        per_group_budget(config.sample_budget, groups.len()),
                        &mut sampling_rng,
                    );
                    let table = trimmed.select_rows(&picked);
                    let prior = picked.iter().map(|&r| carried[r]).collect();
                    RoundInput {
                        table,
                        prior: Some(prior),
                        seed_pairs: selection.pairs.len(),
                        collision_retries: selection.collisions_resolved,
                    }
                }
            };

            if input.table.is_empty() {
                return Err(Error::EmptyPopulation);
            }

            // Step 2: Normalize features.
            let scaled = zscore_scale(&input.table)?;
            if !scaled.dropped.is_empty() {
                eprintln!(
                    "[leakprobe] round {}: dropped all-zero columns: {}",
                    round,
                    scaled.dropped.join(", ")
                );
            }

            // Step 3: Project to the plane, unless embedding is disabled, in
            // which case downstream stages run on normalized features.
            let coords = if config.embedding {
                embed(
                    &scaled.matrix,
                    &EmbedConfig {
                        neighbors: config.embed_neighbors,
                        iterations: config.embed_iterations,
                        learning_rate: DEFAULT_EMBED_LEARNING_RATE,
                        seed: counter_rng_seed(config.seed, EMBED_STREAM),
                    },
                )
            } else {
                scaled.matrix.clone()
            };

            // Step 4: Partition. Round 0 carries the fixed seed label.
            let labels: Vec<Label> = if round == 0 {
                vec![ROUND_ZERO_LABEL; input.table.len()]
            } else {
                match config.partition {
                    PartitionStrategy::Density => density_cluster(
                        &coords,
                        &DensityConfig {
                            min_cluster_size: config.min_cluster_size(round),
                            min_samples: config.min_samples,
                            allow_single_cluster: config.allow_single_cluster,
                        },
                    ),
                    PartitionStrategy::FixedK => two_means(
                        &coords,
                        counter_rng_seed(config.seed, KMEANS_STREAM + round as u64),
                    ),
                }
            };

            // Step 5: Collapse clusters that single identities span.
            let merged = merge_identity_clusters(input.table.identities(), &labels);

            // Step 6: Summarize the partition.
            let quality = silhouette_score(&coords, &merged);
            let partition = PartitionSummary::from_labels(&merged, quality);

            // Step 7: Agreement with the labels carried from the previous round.
            let agreement = input.prior.as_ref().map(|prior| AgreementPoint {
                round,
                rand_index: rand_index(prior, &merged),
                adjusted_rand_index: adjusted_rand_index(prior, &merged),
            });
            if let Some(point) = agreement {
                agreement_points.push(point);
            }

            // Step 8: A partition below two clusters ends refinement.
            let collapsed = round > 0 && partition.clusters() < 2;

            // Step 9: Distinguishability test and its histogram artifact.
            let distinguishability = if collapsed {
                Some(DistinguishabilityReport::cannot_test(
                    config.significance,
                    config.bootstrap_iterations,
                ))
            } else if round == 0 || (config.fast && round != terminal_round) {
                None
            } else {
                let test = run_distinguishability(
                    &scaled.matrix,
                    &merged,
                    &DistinguishConfig {
                        kernel_gamma: config.kernel_gamma,
                        significance: config.significance,
                        bootstrap_iterations: config.bootstrap_iterations,
                        base_seed: counter_rng_seed(
                            config.seed,
                            BOOTSTRAP_STREAM + round as u64,
                        ),
                    },
                );
                if let (Some(store), Some(null), Some(observed)) =
                    (&store, &test.null, test.report.observed_mmd)
                {
                    let plot_path = store.null_plot_path(round)?;
                    render_null_histogram(&plot_path, &null.stats, observed, null.threshold)?;
                }
                Some(test.report)
            };

            // Step 10: Record and persist the round.
            let record = RoundRecord {
                round,
                population: input.table.len(),
                distinct_identities: distinct_identities(input.table.identities()),
                partition,
                agreement,
                distinguishability,
                seed_pairs: input.seed_pairs,
                collision_retries: input.collision_retries,
            };

            let labeled =
                LabeledTable::new(round, scaled_table(&input.table, &scaled), merged);
            if let Some(store) = &store {
                store.write_labeled_table(&labeled)?;
                if config.embedding {
                    store.write_embedding(round, input.table.identities(), &coords)?;
                }
                store.write_stats_text(&record)?;
                store.write_round_report(&record)?;
            }

            if collapsed {
                let non_noise = record.partition.clusters();
                rounds.push(record);
                if round == terminal_round {
                    return Err(Error::DegenerateClustering { round, non_noise });
                }
                eprintln!(
                    "[leakprobe] round {}: partition collapsed to {} cluster(s); halting refinement",
                    round, non_noise
                );
                outcome = RunOutcome::CollapsedEarly { round };
                break;
            }

            rounds.push(record);
            previous = Some(RoundState { labeled, coords });
        }

        // Step 11: Fold the rounds into the run report.
        let trajectory = assess_trajectory(agreement_points);
        let report = RunReport { config: config.clone(), rounds, trajectory, outcome };
        if let Some(store) = &store {
            store.write_run_report(&report)?;
        }
        Ok(report)
    }
}

/// Majority label of each identity; ties resolve to the smallest label.
fn identity_label_map(labeled: &LabeledTable) -> BTreeMap<String, Label> {
    let mut counts: BTreeMap<&str, BTreeMap<Label, usize>> = BTreeMap::new();
    for (identity, &label) in labeled.table.identities().iter().zip(labeled.labels.iter()) {
        *counts.entry(identity.as_str()).or_default().entry(label).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|(identity, by_label)| {
            let mut best: Option<(Label, usize)> = None;
            for (&label, &count) in &by_label {
                // Ascending label order, so the first maximum wins ties.
                let better = match best {
                    None => true,
                    Some((_, best_count)) => count > best_count,
                };
                if better {
                    best = Some((label, count));
                }
            }
            (identity.to_string(), best.map(|(label, _)| label).unwrap_or(NOISE))
        })
        .collect()
}

/// Previous-round label for each row, [`NOISE`] for unseen identities.
fn carried_labels(table: &FeatureTable, map: &BTreeMap<String, Label>) -> Vec<Label> {
    table
        .identities()
        .iter()
        .map(|identity| map.get(identity).copied().unwrap_or(NOISE))
        .collect()
}

/// Rebuild a feature table holding the normalized matrix.
fn scaled_table(input: &FeatureTable, scaled: &crate::statistics::ScaledFeatures) -> FeatureTable {
    let mut table = FeatureTable::new(scaled.columns.clone());
    for (row, identity) in input.identities().iter().enumerate() {
        let values = (0..scaled.matrix.ncols()).map(|c| scaled.matrix[(row, c)]).collect();
        table.push_row(identity.clone(), values);
    }
    table
}

fn distinct_identities(identities: &[String]) -> usize {
    identities.iter().collect::<BTreeSet<_>>().len()
}
