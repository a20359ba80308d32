//! Analysis passes that sit on top of the per-round pipeline.
//!
//! This module implements:
//!
//! 1. **Distinguishability**: MMD two-sample test of the two dominant
//!    clusters against a pooled bootstrap null
//! 2. **Trajectory**: cross-round agreement slope and trend
//! 3. **Calibration**: synthetic-scenario sweep that picks an
//!    adjusted-Rand-index decision threshold

mod calibration;
mod distinguish;
mod trajectory;

pub use calibration::{calibrate_ari_threshold, CalibrationConfig, CalibrationReport, RocPoint};
pub use distinguish::{run_distinguishability, DistinguishConfig, DistinguishOutcome};
pub use trajectory::assess_trajectory;
