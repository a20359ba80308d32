//! Cross-round agreement trajectory.
//!
//! Each round past the first compares its merged partition against the
//! labels carried over from the previous round. The sequence of adjusted
//! Rand indices tells whether refinement is converging on stable structure
//! (agreement rises toward 1) or tearing it apart.

use crate::result::{AgreementPoint, Trajectory, TrajectoryTrend};

/// Fit the agreement points into a [`Trajectory`].
///
/// The slope is an ordinary least-squares fit of adjusted Rand index over
/// round index. Fewer than two points cannot carry a direction and come
/// back flat.
pub fn assess_trajectory(points: Vec<AgreementPoint>) -> Trajectory {
    let slope = least_squares_slope(&points);
    Trajectory { trend: TrajectoryTrend::from_slope(slope), slope, points }
}

fn least_squares_slope(points: &[AgreementPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let n = points.len() as f64;
    let mean_round = points.iter().map(|p| p.round as f64).sum::<f64>() / n;
    let mean_ari = points.iter().map(|p| p.adjusted_rand_index).sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for point in points {
        let dx = point.round as f64 - mean_round;
        covariance += dx * (point.adjusted_rand_index - mean_ari);
        variance += dx * dx;
    }

    if variance > 0.0 {
        covariance / variance
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(values: &[(usize, f64)]) -> Vec<AgreementPoint> {
        values
            .iter()
            .map(|&(round, ari)| AgreementPoint {
                round,
                rand_index: ari,
                adjusted_rand_index: ari,
            })
            .collect()
    }

    #[test]
    fn rising_agreement_reads_rising() {
        let trajectory = assess_trajectory(points(&[(1, 0.2), (2, 0.5), (3, 0.8)]));
        assert_eq!(trajectory.trend, TrajectoryTrend::Rising);
        assert!((trajectory.slope - 0.3).abs() < 1e-12);
    }

    #[test]
    fn decaying_agreement_reads_degrading() {
        let trajectory = assess_trajectory(points(&[(1, 0.9), (2, 0.6), (3, 0.2)]));
        assert_eq!(trajectory.trend, TrajectoryTrend::Degrading);
        assert!(trajectory.slope < 0.0);
    }

    #[test]
    fn stable_agreement_reads_flat() {
        let trajectory = assess_trajectory(points(&[(1, 0.8), (2, 0.81), (3, 0.79), (4, 0.8)]));
        assert_eq!(trajectory.trend, TrajectoryTrend::Flat);
    }

    #[test]
    fn short_trajectories_are_flat() {
        assert_eq!(assess_trajectory(vec![]).trend, TrajectoryTrend::Flat);
        let single = assess_trajectory(points(&[(1, 0.9)]));
        assert_eq!(single.trend, TrajectoryTrend::Flat);
        assert_eq!(single.slope, 0.0);
        assert_eq!(single.points.len(), 1);
    }

    #[test]
    fn non_consecutive_rounds_fit_by_index() {
        // Gaps from skipped rounds weight the fit by actual round numbers.
        let trajectory = assess_trajectory(points(&[(1, 0.1), (5, 0.9)]));
        assert!((trajectory.slope - 0.2).abs() < 1e-12);
        assert_eq!(trajectory.trend, TrajectoryTrend::Rising);
    }
}
