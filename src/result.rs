//! Result types for rounds and whole runs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::constants::TREND_SLOPE_TOLERANCE;
use crate::types::{Label, NOISE};

/// Outcome of one distinguishability test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Observed statistic cleared the null threshold.
    Different,
    /// Observed statistic sat inside the null distribution.
    Similar,
    /// Fewer than two non-noise clusters survived; nothing to compare.
    CannotTest,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Different => write!(f, "distributions are different"),
            Verdict::Similar => write!(f, "distributions are similar"),
            Verdict::CannotTest => write!(f, "cannot test"),
        }
    }
}

/// Full record of one distinguishability test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistinguishabilityReport {
    /// The decision.
    pub verdict: Verdict,
    /// The two cluster labels that were compared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_pair: Option<(Label, Label)>,
    /// Row counts of the compared populations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population_sizes: Option<(usize, usize)>,
    /// Observed squared MMD between the populations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_mmd: Option<f64>,
    /// Upper-quantile threshold of the bootstrap null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Significance level the threshold was taken at.
    pub significance: f64,
    /// Bootstrap resamples behind the threshold.
    pub bootstrap_iterations: usize,
}

impl DistinguishabilityReport {
    /// Report for a round where no comparison was possible.
    pub fn cannot_test(significance: f64, bootstrap_iterations: usize) -> Self {
        Self {
            verdict: Verdict::CannotTest,
            cluster_pair: None,
            population_sizes: None,
            observed_mmd: None,
            threshold: None,
            significance,
            bootstrap_iterations,
        }
    }
}

/// Shape of one round's partition after identity merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionSummary {
    /// Rows per non-noise cluster.
    pub cluster_sizes: BTreeMap<Label, usize>,
    /// Rows labeled noise.
    pub noise: usize,
    /// Mean silhouette coefficient, when defined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
}

impl PartitionSummary {
    /// Summarize a label array.
    pub fn from_labels(labels: &[Label], quality: Option<f64>) -> Self {
        let mut cluster_sizes: BTreeMap<Label, usize> = BTreeMap::new();
        let mut noise = 0;
        for &label in labels {
            if label == NOISE {
                noise += 1;
            } else {
                *cluster_sizes.entry(label).or_insert(0) += 1;
            }
        }
        Self { cluster_sizes, noise, quality }
    }

    /// Number of non-noise clusters.
    pub fn clusters(&self) -> usize {
        self.cluster_sizes.len()
    }
}

/// Agreement between one round's partition and the previous round's labels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AgreementPoint {
    /// Round the comparison belongs to.
    pub round: usize,
    /// Plain Rand index against the carried-over labels.
    pub rand_index: f64,
    /// Chance-corrected Rand index against the carried-over labels.
    pub adjusted_rand_index: f64,
}

/// Direction the agreement trajectory is heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryTrend {
    /// Agreement improves as rounds narrow the population.
    Rising,
    /// No slope beyond tolerance either way.
    Flat,
    /// Agreement decays; refinement is losing structure.
    Degrading,
}

impl TrajectoryTrend {
    /// Classify a least-squares slope of adjusted Rand index over rounds.
    pub fn from_slope(slope: f64) -> Self {
        if slope > TREND_SLOPE_TOLERANCE {
            TrajectoryTrend::Rising
        } else if slope < -TREND_SLOPE_TOLERANCE {
            TrajectoryTrend::Degrading
        } else {
            TrajectoryTrend::Flat
        }
    }
}

impl fmt::Display for TrajectoryTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrajectoryTrend::Rising => write!(f, "rising"),
            TrajectoryTrend::Flat => write!(f, "flat"),
            TrajectoryTrend::Degrading => write!(f, "degrading"),
        }
    }
}

/// Cross-round agreement trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    /// One point per round that had a previous labeling to compare against.
    pub points: Vec<AgreementPoint>,
    /// Least-squares slope of adjusted Rand index over round index.
    pub slope: f64,
    /// Classified direction of the slope.
    pub trend: TrajectoryTrend,
}

/// Everything recorded about one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round index, 0-based.
    pub round: usize,
    /// Rows in this round's population.
    pub population: usize,
    /// Distinct identities in this round's population.
    pub distinct_identities: usize,
    /// Partition shape after identity merging.
    pub partition: PartitionSummary,
    /// Agreement with the previous round, absent for round 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement: Option<AgreementPoint>,
    /// Distinguishability test, absent when skipped or impossible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinguishability: Option<DistinguishabilityReport>,
    /// Boundary pairs that seeded this round's population.
    pub seed_pairs: usize,
    /// Same-identity farthest-pair hits resolved while selecting those pairs.
    pub collision_retries: usize,
}

impl RoundRecord {
    /// Human-readable per-round summary, one fact per line.
    pub fn stats_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("round {}\n", self.round));
        out.push_str(&format!(
            "population: {} rows, {} identities\n",
            self.population, self.distinct_identities
        ));

        let sizes = self
            .partition
            .cluster_sizes
            .iter()
            .map(|(label, count)| format!("{}={}", label, count))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(
            "clusters: {} ({}), noise: {}\n",
            self.partition.clusters(),
            if sizes.is_empty() { "none" } else { &sizes },
            self.partition.noise
        ));

        match self.partition.quality {
            Some(q) => out.push_str(&format!("silhouette: {:.4}\n", q)),
            None => out.push_str("silhouette: undefined\n"),
        }

        if let Some(agreement) = &self.agreement {
            out.push_str(&format!(
                "agreement vs previous: rand {:.4}, adjusted {:.4}\n",
                agreement.rand_index, agreement.adjusted_rand_index
            ));
        }

        if let Some(test) = &self.distinguishability {
            match (test.observed_mmd, test.threshold) {
                (Some(observed), Some(threshold)) => out.push_str(&format!(
                    "verdict: {} (mmd {:.6}, threshold {:.6})\n",
                    test.verdict, observed, threshold
                )),
                _ => out.push_str(&format!("verdict: {}\n", test.verdict)),
            }
        }

        if self.seed_pairs > 0 || self.collision_retries > 0 {
            out.push_str(&format!(
                "boundary pairs consumed: {}, collisions resolved: {}\n",
                self.seed_pairs, self.collision_retries
            ));
        }

        out
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every scheduled round ran.
    Completed,
    /// Clustering collapsed before the terminal round; later rounds were
    /// skipped.
    CollapsedEarly {
        /// Round at which the collapse was observed.
        round: usize,
    },
}

/// Complete record of a refinement run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Configuration the run used.
    pub config: Config,
    /// Per-round records, in round order.
    pub rounds: Vec<RoundRecord>,
    /// Agreement trajectory over the rounds that could be compared.
    pub trajectory: Trajectory,
    /// How the run ended.
    pub outcome: RunOutcome,
}

impl RunReport {
    /// The verdict of the last round that ran a distinguishability test, or
    /// [`Verdict::CannotTest`] when no round could.
    pub fn final_verdict(&self) -> Verdict {
        self.rounds
            .iter()
            .rev()
            .find_map(|record| record.distinguishability.as_ref())
            .map(|report| report.verdict)
            .unwrap_or(Verdict::CannotTest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(round: usize, verdict: Option<Verdict>) -> RoundRecord {
        RoundRecord {
            round,
            population: 100,
            distinct_identities: 10,
            partition: PartitionSummary::from_labels(&[0, 0, 1, -1], Some(0.5)),
            agreement: None,
            distinguishability: verdict.map(|v| DistinguishabilityReport {
                verdict: v,
                ..DistinguishabilityReport::cannot_test(0.05, 100)
            }),
            seed_pairs: 0,
            collision_retries: 0,
        }
    }

    #[test]
    fn partition_summary_splits_noise_from_clusters() {
        let summary = PartitionSummary::from_labels(&[0, 0, 2, -1, -1, 2, 2], None);
        assert_eq!(summary.clusters(), 2);
        assert_eq!(summary.cluster_sizes[&0], 2);
        assert_eq!(summary.cluster_sizes[&2], 3);
        assert_eq!(summary.noise, 2);
    }

    #[test]
    fn verdict_wording_is_stable() {
        assert_eq!(Verdict::Different.to_string(), "distributions are different");
        assert_eq!(Verdict::Similar.to_string(), "distributions are similar");
        assert_eq!(Verdict::CannotTest.to_string(), "cannot test");
    }

    #[test]
    fn trend_classification_respects_tolerance() {
        assert_eq!(TrajectoryTrend::from_slope(0.5), TrajectoryTrend::Rising);
        assert_eq!(TrajectoryTrend::from_slope(-0.5), TrajectoryTrend::Degrading);
        assert_eq!(TrajectoryTrend::from_slope(0.001), TrajectoryTrend::Flat);
        assert_eq!(TrajectoryTrend::from_slope(-0.001), TrajectoryTrend::Flat);
    }

    #[test]
    fn final_verdict_comes_from_the_last_tested_round() {
        let report = RunReport {
            config: Config::default(),
            rounds: vec![
                record(0, None),
                record(1, Some(Verdict::Different)),
                record(2, Some(Verdict::Similar)),
                record(3, None),
            ],
            trajectory: Trajectory { points: vec![], slope: 0.0, trend: TrajectoryTrend::Flat },
            outcome: RunOutcome::Completed,
        };
        assert_eq!(report.final_verdict(), Verdict::Similar);
    }

    #[test]
    fn final_verdict_defaults_to_cannot_test() {
        let report = RunReport {
            config: Config::default(),
            rounds: vec![record(0, None)],
            trajectory: Trajectory { points: vec![], slope: 0.0, trend: TrajectoryTrend::Flat },
            outcome: RunOutcome::CollapsedEarly { round: 0 },
        };
        assert_eq!(report.final_verdict(), Verdict::CannotTest);
    }

    #[test]
    fn stats_text_lists_the_round_facts() {
        let mut rec = record(4, Some(Verdict::Different));
        rec.distinguishability = Some(DistinguishabilityReport {
            verdict: Verdict::Different,
            cluster_pair: Some((0, 1)),
            population_sizes: Some((50, 48)),
            observed_mmd: Some(0.031),
            threshold: Some(0.012),
            significance: 0.05,
            bootstrap_iterations: 1000,
        });
        rec.agreement =
            Some(AgreementPoint { round: 4, rand_index: 0.94, adjusted_rand_index: 0.88 });
        rec.seed_pairs = 12;
        rec.collision_retries = 2;

        let text = rec.stats_text();
        assert!(text.contains("round 4"));
        assert!(text.contains("100 rows, 10 identities"));
        assert!(text.contains("distributions are different"));
        assert!(text.contains("rand 0.9400"));
        assert!(text.contains("boundary pairs consumed: 12"));
    }
}
