//! Type aliases and common types.

/// Cluster label assigned to one sample within one round.
///
/// Values ≥ 0 identify a cluster; [`NOISE`] marks samples that no dense
/// region claimed.
pub type Label = i32;

/// Label value for noise/unassigned samples.
pub const NOISE: Label = -1;

/// Strategy used by the partitioner for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionStrategy {
    /// Density-based clustering: variable cluster count, noise label,
    /// minimum cluster size growing with the round index.
    Density,
    /// Fixed two-cluster assignment for robust binary reporting.
    FixedK,
}
