//! Feature tables and per-round labeled tables.
//!
//! A [`FeatureTable`] holds one row per measured sample: a string identity
//! key plus named numeric feature columns. Identities and labels never live
//! inside the numeric columns, so identifier passthrough is structural
//! rather than a list of "ignore" column names.
//!
//! A [`LabeledTable`] pairs a table with the label array of one explicit
//! round index. Round numbers are carried as data, never encoded in column
//! names.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::DMatrix;

use crate::error::{Error, Result};
use crate::types::Label;

/// Header name of the identity column in persisted tables.
pub const IDENTITY_COLUMN: &str = "identity";

/// Header name of the label column in persisted labeled tables.
pub const LABEL_COLUMN: &str = "label";

/// A samples × features table keyed by sample identity.
///
/// Row order is meaningful and preserved by every operation. Identities may
/// repeat: multiple rows share an identity when the same underlying input
/// artifact was measured more than once.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    identities: Vec<String>,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureTable {
    /// Create an empty table with the given feature columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self { identities: Vec::new(), columns, rows: Vec::new() }
    }

    /// Append one row.
    ///
    /// # Panics
    ///
    /// Panics if `values.len()` does not match the column count, or if the
    /// identity contains a comma (identities must survive CSV persistence).
    pub fn push_row(&mut self, identity: impl Into<String>, values: Vec<f64>) {
        let identity = identity.into();
        assert_eq!(
            values.len(),
            self.columns.len(),
            "row width must match the table schema"
        );
        assert!(!identity.contains(','), "identity keys must not contain commas");
        self.identities.push(identity);
        self.rows.push(values);
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of feature columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Identity key of every row, in row order.
    pub fn identities(&self) -> &[String] {
        &self.identities
    }

    /// Feature column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Feature values of one row.
    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    /// Copy the numeric block into a dense matrix (rows × features).
    pub fn to_matrix(&self) -> DMatrix<f64> {
        let mut matrix = DMatrix::zeros(self.len(), self.width());
        for (i, row) in self.rows.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                matrix[(i, j)] = *value;
            }
        }
        matrix
    }

    /// Build a new table from selected row indices (repeats allowed).
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut out = Self::new(self.columns.clone());
        for &i in indices {
            out.push_row(self.identities[i].clone(), self.rows[i].clone());
        }
        out
    }

    /// Row indices grouped by identity, keys in lexicographic order.
    pub fn rows_by_identity(&self) -> BTreeMap<String, Vec<usize>> {
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, identity) in self.identities.iter().enumerate() {
            groups.entry(identity.clone()).or_default().push(i);
        }
        groups
    }

    /// Write the table as CSV with an `identity` column first.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path)
            .map_err(|err| Error::ArtifactIo { path: path.to_path_buf(), source: err })?;
        let mut out = BufWriter::new(file);
        let write_err = |err| Error::ArtifactIo { path: path.to_path_buf(), source: err };

        writeln!(out, "{},{}", IDENTITY_COLUMN, self.columns.join(",")).map_err(write_err)?;
        for (identity, row) in self.identities.iter().zip(&self.rows) {
            write!(out, "{}", identity).map_err(write_err)?;
            for value in row {
                write!(out, ",{}", value).map_err(write_err)?;
            }
            writeln!(out).map_err(write_err)?;
        }
        out.flush().map_err(write_err)
    }

    /// Read a CSV written by [`FeatureTable::write_csv`].
    ///
    /// The header must contain an `identity` column; every other column is
    /// parsed as a numeric feature.
    pub fn read_csv(path: &Path) -> Result<Self> {
        let (table, _) = read_rows(path, false)?;
        Ok(table)
    }
}

/// A feature table bound to the label array of one round.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    /// Round index these labels belong to.
    pub round: usize,
    /// The underlying samples.
    pub table: FeatureTable,
    /// One label per row, same order as the table.
    pub labels: Vec<Label>,
}

impl LabeledTable {
    /// Bind labels to a table for an explicit round.
    ///
    /// # Panics
    ///
    /// Panics if the label array length differs from the row count.
    pub fn new(round: usize, table: FeatureTable, labels: Vec<Label>) -> Self {
        assert_eq!(
            labels.len(),
            table.len(),
            "label array must have one entry per table row"
        );
        Self { round, table, labels }
    }

    /// Row indices grouped by label, keys ascending.
    pub fn rows_by_label(&self) -> BTreeMap<Label, Vec<usize>> {
        let mut groups: BTreeMap<Label, Vec<usize>> = BTreeMap::new();
        for (i, label) in self.labels.iter().enumerate() {
            groups.entry(*label).or_default().push(i);
        }
        groups
    }

    /// Write identities, features, and labels as CSV.
    ///
    /// The round index is not written; it is carried by the round-scoped
    /// location of the file and passed back in on read.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path)
            .map_err(|err| Error::ArtifactIo { path: path.to_path_buf(), source: err })?;
        let mut out = BufWriter::new(file);
        let write_err = |err| Error::ArtifactIo { path: path.to_path_buf(), source: err };

        writeln!(
            out,
            "{},{},{}",
            IDENTITY_COLUMN,
            self.table.columns.join(","),
            LABEL_COLUMN
        )
        .map_err(write_err)?;
        for i in 0..self.table.len() {
            write!(out, "{}", self.table.identities[i]).map_err(write_err)?;
            for value in &self.table.rows[i] {
                write!(out, ",{}", value).map_err(write_err)?;
            }
            writeln!(out, ",{}", self.labels[i]).map_err(write_err)?;
        }
        out.flush().map_err(write_err)
    }

    /// Read a CSV written by [`LabeledTable::write_csv`], binding it to the
    /// caller-supplied round index.
    pub fn read_csv(path: &Path, round: usize) -> Result<Self> {
        let (table, labels) = read_rows(path, true)?;
        let labels = labels.ok_or_else(|| Error::MissingSchema { column: LABEL_COLUMN.to_string() })?;
        Ok(Self::new(round, table, labels))
    }
}

/// Shared CSV reader for plain and labeled tables.
fn read_rows(path: &Path, expect_label: bool) -> Result<(FeatureTable, Option<Vec<Label>>)> {
    let file = fs::File::open(path)
        .map_err(|err| Error::ArtifactIo { path: path.to_path_buf(), source: err })?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines().enumerate();

    let header = match lines.next() {
        Some((_, Ok(line))) => line,
        Some((_, Err(err))) => {
            return Err(Error::ArtifactIo { path: path.to_path_buf(), source: err })
        }
        None => return Err(Error::MissingSchema { column: IDENTITY_COLUMN.to_string() }),
    };

    let fields: Vec<&str> = header.split(',').map(str::trim).collect();
    let identity_at = fields
        .iter()
        .position(|name| *name == IDENTITY_COLUMN)
        .ok_or_else(|| Error::MissingSchema { column: IDENTITY_COLUMN.to_string() })?;
    let label_at = fields.iter().position(|name| *name == LABEL_COLUMN);
    if expect_label && label_at.is_none() {
        return Err(Error::MissingSchema { column: LABEL_COLUMN.to_string() });
    }

    let columns: Vec<String> = fields
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != identity_at && Some(*i) != label_at)
        .map(|(_, name)| name.to_string())
        .collect();

    let mut table = FeatureTable::new(columns);
    let mut labels: Vec<Label> = Vec::new();

    for (line_index, line) in lines {
        let line = line.map_err(|err| Error::ArtifactIo { path: path.to_path_buf(), source: err })?;
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() != fields.len() {
            return Err(Error::MalformedTable {
                path: path.to_path_buf(),
                line: line_index + 1,
                message: format!("expected {} fields, found {}", fields.len(), parts.len()),
            });
        }

        let mut identity = String::new();
        let mut values = Vec::with_capacity(table.width());
        for (i, part) in parts.iter().enumerate() {
            if i == identity_at {
                identity = part.trim().to_string();
            } else if Some(i) == label_at {
                let label: Label = part.trim().parse().map_err(|_| Error::MalformedTable {
                    path: path.to_path_buf(),
                    line: line_index + 1,
                    message: format!("invalid label `{}`", part.trim()),
                })?;
                labels.push(label);
            } else {
                let value: f64 = part.trim().parse().map_err(|_| Error::MalformedTable {
                    path: path.to_path_buf(),
                    line: line_index + 1,
                    message: format!("invalid number `{}`", part.trim()),
                })?;
                values.push(value);
            }
        }
        table.push_row(identity, values);
    }

    Ok((table, label_at.map(|_| labels)))
}
