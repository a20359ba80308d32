//! # leakprobe
//!
//! Detect secret-dependent behavior in measurement populations.
//!
//! This crate refines a population of feature vectors over several rounds,
//! each round resampling toward the boundary between emerging clusters,
//! and reports:
//! - whether the two dominant clusters are statistically distinguishable
//!   (kernel MMD against a bootstrap null)
//! - how stable the partition is from round to round (Rand index trajectory)
//! - per-round artifacts: labeled populations, planar embeddings, boundary
//!   pairs, and null-distribution plots
//!
//! ## ⚠️ Common Pitfall: Identities Must Name the Secret
//!
//! Every row carries an *identity*: the secret-dependent input that produced
//! the measurement. Refinement merges clusters spanned by one identity and
//! removes whole identities once a boundary pair consumes them, so tagging
//! rows by batch, run, or timestamp instead of by input destroys the
//! analysis. One secret input, one identity string, many rows.
//!
//! ## Quick Start
//!
//! ```ignore
//! use leakprobe::{FeatureTable, LeakProbe, TableProducer};
//!
//! let mut table = FeatureTable::new(vec!["latency_ns".into(), "cache_misses".into()]);
//! table.push_row("key_a", vec![412.0, 17.0]);
//! table.push_row("key_b", vec![389.0, 12.0]);
//! // ... many rows per identity ...
//!
//! let report = LeakProbe::new()
//!     .artifact_root("target/leakprobe")
//!     .run(&mut TableProducer::new(table))?;
//!
//! println!("{}", leakprobe::output::format_report(&report));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod config;
mod constants;
mod error;
mod probe;
mod result;
mod thread_pool;
mod types;

// Functional modules
pub mod analysis;
pub mod artifacts;
pub mod cluster;
pub mod embed;
pub mod output;
pub mod producer;
pub mod sampling;
pub mod select;
pub mod statistics;
pub mod table;

// Re-exports for public API
pub use config::Config;
pub use constants::{
    DEFAULT_BOOTSTRAP_ITERATIONS, DEFAULT_KERNEL_GAMMA, DEFAULT_SAMPLE_BUDGET, ROUND_ZERO_LABEL,
};
pub use error::{Error, Result};
pub use probe::LeakProbe;
pub use result::{
    AgreementPoint, DistinguishabilityReport, PartitionSummary, RoundRecord, RunOutcome,
    RunReport, Trajectory, TrajectoryTrend, Verdict,
};
pub use types::{Label, PartitionStrategy, NOISE};

// Re-export the working surfaces most callers touch
pub use artifacts::RoundStore;
pub use producer::{ProducerFactory, ProducerRegistry, RoundInputProducer, TableProducer};
pub use select::{BoundaryPair, BoundarySelection};
pub use table::{FeatureTable, LabeledTable};

/// Convenience function: run a full refinement with default configuration.
///
/// Equivalent to `LeakProbe::new().run(producer)`. Use [`LeakProbe`]
/// directly to adjust rounds, budgets, clustering, or artifact output.
///
/// # Errors
///
/// See [`LeakProbe::run`].
pub fn run(producer: &mut dyn RoundInputProducer) -> Result<RunReport> {
    LeakProbe::new().run(producer)
}
