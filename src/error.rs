//! Error types for the refinement pipeline.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure modes of the refinement pipeline.
///
/// Data-shape problems ([`Error::MissingSchema`], [`Error::EmptyPopulation`],
/// [`Error::MalformedTable`]) abort the current round before any of its
/// artifacts are written. [`Error::DegenerateClustering`] is only returned
/// when the terminal round collapses; a mid-run collapse downgrades to a
/// recorded halt instead.
#[derive(Debug)]
pub enum Error {
    /// A required column is absent from an input table.
    MissingSchema {
        /// Name of the missing column.
        column: String,
    },
    /// An input table has zero rows.
    EmptyPopulation,
    /// The terminal round produced fewer than two non-noise clusters, so
    /// the aggregate report has nothing to assess.
    DegenerateClustering {
        /// Round at which clustering collapsed.
        round: usize,
        /// Number of non-noise clusters that survived.
        non_noise: usize,
    },
    /// No producer is registered under the requested name.
    UnknownProducer {
        /// The name that was looked up.
        name: String,
    },
    /// The round input producer failed or violated its contract.
    Producer {
        /// Round whose input was being built.
        round: usize,
        /// Producer-supplied or contract-violation message.
        message: String,
    },
    /// Failed to read or write a round artifact.
    ArtifactIo {
        /// Path we attempted to access.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A persisted table could not be parsed.
    MalformedTable {
        /// Path of the offending file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What went wrong on that line.
        message: String,
    },
    /// Report serialization failed.
    Report(serde_json::Error),
    /// Plot rendering failed.
    Plot(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingSchema { column } => {
                write!(f, "required column `{}` is missing from the input table", column)
            }
            Error::EmptyPopulation => write!(f, "input table has no rows"),
            Error::DegenerateClustering { round, non_noise } => write!(
                f,
                "round {}: clustering collapsed to {} non-noise cluster(s); nothing left to refine",
                round, non_noise
            ),
            Error::UnknownProducer { name } => {
                write!(f, "no input producer registered under `{}`", name)
            }
            Error::Producer { round, message } => {
                write!(f, "round {}: input producer failed: {}", round, message)
            }
            Error::ArtifactIo { path, source } => {
                write!(f, "failed to access artifact {}: {}", path.display(), source)
            }
            Error::MalformedTable { path, line, message } => {
                write!(f, "{}:{}: {}", path.display(), line, message)
            }
            Error::Report(err) => write!(f, "failed to serialize report: {}", err),
            Error::Plot(message) => write!(f, "failed to render plot: {}", message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ArtifactIo { source, .. } => Some(source),
            Error::Report(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Report(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_missing_column() {
        let err = Error::MissingSchema { column: "identity".to_string() };
        assert!(err.to_string().contains("`identity`"));
    }

    #[test]
    fn display_includes_round_for_degenerate_clustering() {
        let err = Error::DegenerateClustering { round: 7, non_noise: 1 };
        let text = err.to_string();
        assert!(text.contains("round 7"), "got: {}", text);
        assert!(text.contains("1 non-noise"), "got: {}", text);
    }

    #[test]
    fn artifact_io_exposes_source() {
        use std::error::Error as _;
        let err = Error::ArtifactIo {
            path: PathBuf::from("/tmp/rounds/round_3/labels.csv"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("round_3"));
    }
}
