//! Statistical primitives for the refinement pipeline.
//!
//! This module provides the numeric infrastructure the engine builds on:
//! - Z-score feature scaling with degenerate-column handling
//! - Maximum mean discrepancy (MMD) with a Gaussian RBF kernel
//! - Pooled bootstrap estimation of the MMD null distribution
//! - Rand-index family agreement measures between labelings

mod agreement;
mod bootstrap;
mod mmd;
mod normalize;

pub use agreement::{adjusted_rand_index, rand_index};
pub use bootstrap::{counter_rng_seed, mmd_null_distribution, NullDistribution};
pub use mmd::{mmd_statistic, rbf_kernel};
pub use normalize::{zscore_scale, ScaledFeatures};
