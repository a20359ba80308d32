//! Maximum mean discrepancy with a Gaussian RBF kernel.
//!
//! MMD measures the distance between two empirical distributions in a
//! reproducing kernel Hilbert space. With a characteristic kernel it is 0
//! only when the two distributions agree, which makes it a natural test
//! statistic for "do these two clusters come from the same population".

use nalgebra::DMatrix;

/// Squared Euclidean distance between row `i` of `a` and row `j` of `b`.
#[inline]
fn squared_row_distance(a: &DMatrix<f64>, i: usize, b: &DMatrix<f64>, j: usize) -> f64 {
    let mut sum = 0.0;
    for c in 0..a.ncols() {
        let d = a[(i, c)] - b[(j, c)];
        sum += d * d;
    }
    sum
}

/// Mean of the RBF kernel over all row pairs of `a` × `b`.
fn mean_rbf(a: &DMatrix<f64>, b: &DMatrix<f64>, gamma: f64) -> f64 {
    let mut sum = 0.0;
    for i in 0..a.nrows() {
        for j in 0..b.nrows() {
            sum += (-gamma * squared_row_distance(a, i, b, j)).exp();
        }
    }
    sum / (a.nrows() * b.nrows()) as f64
}

/// Full RBF kernel matrix `K[i, j] = exp(-gamma * ||a_i - b_j||²)`.
pub fn rbf_kernel(a: &DMatrix<f64>, b: &DMatrix<f64>, gamma: f64) -> DMatrix<f64> {
    let mut kernel = DMatrix::zeros(a.nrows(), b.nrows());
    for i in 0..a.nrows() {
        for j in 0..b.nrows() {
            kernel[(i, j)] = (-gamma * squared_row_distance(a, i, b, j)).exp();
        }
    }
    kernel
}

/// Biased MMD² estimate between the rows of `x` and the rows of `y`:
/// `mean(K_xx) + mean(K_yy) - 2·mean(K_xy)`.
///
/// Rows are samples; both matrices must share a column schema. Returns 0.0
/// when either population is empty.
///
/// # Panics
///
/// Panics if the two matrices have different column counts.
pub fn mmd_statistic(x: &DMatrix<f64>, y: &DMatrix<f64>, gamma: f64) -> f64 {
    assert_eq!(
        x.ncols(),
        y.ncols(),
        "both populations must share one feature schema"
    );
    if x.nrows() == 0 || y.nrows() == 0 {
        return 0.0;
    }
    mean_rbf(x, x, gamma) + mean_rbf(y, y, gamma) - 2.0 * mean_rbf(x, y, gamma)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[[f64; 2]]) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(rows.len(), 2);
        for (i, row) in rows.iter().enumerate() {
            m[(i, 0)] = row[0];
            m[(i, 1)] = row[1];
        }
        m
    }

    #[test]
    fn identical_populations_have_zero_mmd() {
        let x = matrix(&[[0.0, 0.0], [1.0, 1.0], [2.0, 0.5]]);
        let mmd = mmd_statistic(&x, &x.clone(), 1.0);
        assert!(mmd.abs() < 1e-12, "identical samples should give MMD 0, got {}", mmd);
    }

    #[test]
    fn separated_populations_have_positive_mmd() {
        let x = matrix(&[[0.0, 0.0], [0.1, -0.1], [-0.2, 0.05]]);
        let y = matrix(&[[5.0, 5.0], [5.1, 4.9], [4.8, 5.2]]);
        let mmd = mmd_statistic(&x, &y, 1.0);
        assert!(mmd > 0.5, "well-separated samples should give large MMD, got {}", mmd);
    }

    #[test]
    fn statistic_is_symmetric() {
        let x = matrix(&[[0.0, 1.0], [2.0, 3.0]]);
        let y = matrix(&[[1.0, 0.0], [3.0, 1.0], [0.5, 0.5]]);
        let forward = mmd_statistic(&x, &y, 0.7);
        let backward = mmd_statistic(&y, &x, 0.7);
        assert!((forward - backward).abs() < 1e-12);
    }

    #[test]
    fn kernel_diagonal_is_one_for_shared_rows() {
        let x = matrix(&[[1.0, 2.0], [3.0, 4.0]]);
        let kernel = rbf_kernel(&x, &x, 1.0);
        assert!((kernel[(0, 0)] - 1.0).abs() < 1e-12);
        assert!((kernel[(1, 1)] - 1.0).abs() < 1e-12);
        assert!(kernel[(0, 1)] < 1.0);
    }

    #[test]
    fn larger_gamma_sharpens_the_kernel() {
        let x = matrix(&[[0.0, 0.0]]);
        let y = matrix(&[[1.0, 0.0]]);
        let wide = rbf_kernel(&x, &y, 0.1)[(0, 0)];
        let narrow = rbf_kernel(&x, &y, 10.0)[(0, 0)];
        assert!(narrow < wide);
    }

    #[test]
    fn empty_population_gives_zero() {
        let x = matrix(&[]);
        let y = matrix(&[[1.0, 1.0]]);
        assert_eq!(mmd_statistic(&x, &y, 1.0), 0.0);
    }
}
