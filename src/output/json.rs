//! JSON serialization for run reports and round artifacts.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::result::RunReport;

/// Serialize a RunReport to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for RunReport).
pub fn to_json(report: &RunReport) -> std::result::Result<String, serde_json::Error> {
    serde_json::to_string(report)
}

/// Serialize a RunReport to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for RunReport).
pub fn to_json_pretty(report: &RunReport) -> std::result::Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// Write any serializable artifact as pretty-printed JSON.
pub fn write_json<T: Serialize>(path: &Path, artifact: &T) -> Result<()> {
    let file = File::create(path)
        .map_err(|err| Error::ArtifactIo { path: path.to_path_buf(), source: err })?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, artifact).map_err(Error::Report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::result::{
        PartitionSummary, RoundRecord, RunOutcome, Trajectory, TrajectoryTrend,
    };

    fn make_report() -> RunReport {
        RunReport {
            config: Config::default(),
            rounds: vec![RoundRecord {
                round: 0,
                population: 200,
                distinct_identities: 20,
                partition: PartitionSummary::from_labels(&[1, 1, 1, 1], None),
                agreement: None,
                distinguishability: None,
                seed_pairs: 0,
                collision_retries: 0,
            }],
            trajectory: Trajectory { points: vec![], slope: 0.0, trend: TrajectoryTrend::Flat },
            outcome: RunOutcome::Completed,
        }
    }

    #[test]
    fn compact_json_carries_the_round_facts() {
        let json = to_json(&make_report()).unwrap();
        assert!(json.contains("\"population\":200"));
        assert!(json.contains("\"outcome\":\"completed\""));
    }

    #[test]
    fn pretty_json_is_multiline() {
        let json = to_json_pretty(&make_report()).unwrap();
        assert!(json.contains('\n'));
        assert!(json.contains("distinct_identities"));
    }

    #[test]
    fn write_json_round_trips_through_a_file() {
        let mut path = std::env::temp_dir();
        path.push(format!("leakprobe-json-{}.json", std::process::id()));

        write_json(&path, &make_report()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let back: RunReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back.rounds.len(), 1);
        assert_eq!(back.rounds[0].population, 200);

        let _ = std::fs::remove_file(&path);
    }
}
