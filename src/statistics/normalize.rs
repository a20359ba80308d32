//! Z-score scaling of feature tables.

use nalgebra::DMatrix;

use crate::error::{Error, Result};
use crate::table::FeatureTable;

/// Output of [`zscore_scale`]: the retained columns and their scaled values.
#[derive(Debug, Clone)]
pub struct ScaledFeatures {
    /// Names of the retained feature columns, in table order.
    pub columns: Vec<String>,
    /// Scaled values, rows × retained columns, row order preserved.
    pub matrix: DMatrix<f64>,
    /// Names of all-zero columns that were dropped before scaling.
    pub dropped: Vec<String>,
}

/// Scale every feature column of `table` to zero mean and unit variance.
///
/// Statistics are computed from the input table itself; nothing is reused
/// across rounds. All-zero columns carry no signal and are dropped before
/// scaling. A constant non-zero column has zero variance; its divisor is
/// clamped so the column scales to all zeros instead of dividing by zero.
///
/// Identities and labels are not part of the numeric block, so they pass
/// through untouched by construction.
///
/// # Errors
///
/// - [`Error::EmptyPopulation`] when the table has no rows.
/// - [`Error::MissingSchema`] when the table has no feature columns at all.
pub fn zscore_scale(table: &FeatureTable) -> Result<ScaledFeatures> {
    if table.is_empty() {
        return Err(Error::EmptyPopulation);
    }
    if table.width() == 0 {
        return Err(Error::MissingSchema { column: "<numeric feature>".to_string() });
    }

    let n = table.len();
    let mut retained: Vec<usize> = Vec::with_capacity(table.width());
    let mut dropped: Vec<String> = Vec::new();

    for (j, name) in table.columns().iter().enumerate() {
        let all_zero = (0..n).all(|i| table.row(i)[j] == 0.0);
        if all_zero {
            dropped.push(name.clone());
        } else {
            retained.push(j);
        }
    }

    let mut matrix = DMatrix::zeros(n, retained.len());
    for (out_j, &j) in retained.iter().enumerate() {
        let mean = (0..n).map(|i| table.row(i)[j]).sum::<f64>() / n as f64;
        let variance = (0..n).map(|i| (table.row(i)[j] - mean).powi(2)).sum::<f64>() / n as f64;
        // Constant columns scale to zero rather than dividing by ~0.
        let std = if variance.sqrt() > 1e-12 { variance.sqrt() } else { 1.0 };
        for i in 0..n {
            matrix[(i, out_j)] = (table.row(i)[j] - mean) / std;
        }
    }

    let columns = retained.iter().map(|&j| table.columns()[j].clone()).collect();
    Ok(ScaledFeatures { columns, matrix, dropped })
}
