//! Round-scoped artifact store.
//!
//! Every round writes its outputs under its own `round_<r>` directory:
//! the labeled population (`labels.csv`), planar coordinates
//! (`embedding.csv`), a human-readable summary (`stats.txt`), the round
//! record (`report.json`), the boundary pairs that seeded the round
//! (`boundary_pairs.json`), and the null histogram (`mmd_null.png`). The
//! whole-run report lands at the root. Paths are always explicit; nothing
//! here depends on the process working directory.

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::DMatrix;

use crate::error::{Error, Result};
use crate::output::write_json;
use crate::result::{RoundRecord, RunReport};
use crate::select::BoundaryPair;
use crate::table::LabeledTable;

/// File name of a round's labeled population.
const LABELS_FILE: &str = "labels.csv";
/// File name of a round's planar coordinates.
const EMBEDDING_FILE: &str = "embedding.csv";
/// File name of a round's human-readable summary.
const STATS_FILE: &str = "stats.txt";
/// File name of a round's (and the run's) JSON report.
const REPORT_FILE: &str = "report.json";
/// File name of the pairs that seeded a round.
const PAIRS_FILE: &str = "boundary_pairs.json";
/// File name of a round's null histogram.
const NULL_PLOT_FILE: &str = "mmd_null.png";

/// Writes and reads per-round artifacts under a fixed root directory.
#[derive(Debug, Clone)]
pub struct RoundStore {
    root: PathBuf,
}

impl RoundStore {
    /// Store rooted at `root`. The directory is created lazily on first
    /// write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one round's artifacts.
    pub fn round_dir(&self, round: usize) -> PathBuf {
        self.root.join(format!("round_{}", round))
    }

    fn ensure_round_dir(&self, round: usize) -> Result<PathBuf> {
        let dir = self.round_dir(round);
        fs::create_dir_all(&dir)
            .map_err(|err| Error::ArtifactIo { path: dir.clone(), source: err })?;
        Ok(dir)
    }

    /// Persist a round's labeled population as `labels.csv`.
    pub fn write_labeled_table(&self, labeled: &LabeledTable) -> Result<PathBuf> {
        let path = self.ensure_round_dir(labeled.round)?.join(LABELS_FILE);
        labeled.write_csv(&path)?;
        Ok(path)
    }

    /// Read back a round's `labels.csv`.
    pub fn read_labeled_table(&self, round: usize) -> Result<LabeledTable> {
        LabeledTable::read_csv(&self.round_dir(round).join(LABELS_FILE), round)
    }

    /// Persist a round's planar coordinates as `embedding.csv`.
    ///
    /// # Panics
    ///
    /// Panics if `coords` is not an `identities.len() x 2` matrix.
    pub fn write_embedding(
        &self,
        round: usize,
        identities: &[String],
        coords: &DMatrix<f64>,
    ) -> Result<PathBuf> {
        assert_eq!(coords.nrows(), identities.len(), "one coordinate row per identity");
        assert_eq!(coords.ncols(), 2, "planar coordinates have two columns");

        let path = self.ensure_round_dir(round)?.join(EMBEDDING_FILE);
        let mut text = String::from("identity,x,y\n");
        for (row, identity) in identities.iter().enumerate() {
            text.push_str(&format!(
                "{},{},{}\n",
                identity,
                coords[(row, 0)],
                coords[(row, 1)]
            ));
        }
        fs::write(&path, text).map_err(|err| Error::ArtifactIo { path: path.clone(), source: err })?;
        Ok(path)
    }

    /// Persist a round's human-readable summary as `stats.txt`.
    pub fn write_stats_text(&self, record: &RoundRecord) -> Result<PathBuf> {
        let path = self.ensure_round_dir(record.round)?.join(STATS_FILE);
        fs::write(&path, record.stats_text())
            .map_err(|err| Error::ArtifactIo { path: path.clone(), source: err })?;
        Ok(path)
    }

    /// Persist a round's record as `report.json`.
    pub fn write_round_report(&self, record: &RoundRecord) -> Result<PathBuf> {
        let path = self.ensure_round_dir(record.round)?.join(REPORT_FILE);
        write_json(&path, record)?;
        Ok(path)
    }

    /// Persist the pairs that seeded `round` as that round's
    /// `boundary_pairs.json`.
    pub fn write_boundary_pairs(&self, round: usize, pairs: &[BoundaryPair]) -> Result<PathBuf> {
        let path = self.ensure_round_dir(round)?.join(PAIRS_FILE);
        write_json(&path, &pairs)?;
        Ok(path)
    }

    /// Where a round's null histogram belongs, with the directory created.
    pub fn null_plot_path(&self, round: usize) -> Result<PathBuf> {
        Ok(self.ensure_round_dir(round)?.join(NULL_PLOT_FILE))
    }

    /// Persist the whole-run report at the store root.
    pub fn write_run_report(&self, report: &RunReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)
            .map_err(|err| Error::ArtifactIo { path: self.root.clone(), source: err })?;
        let path = self.root.join(REPORT_FILE);
        write_json(&path, report)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::PartitionSummary;
    use crate::table::FeatureTable;

    fn temp_store(tag: &str) -> RoundStore {
        let mut root = std::env::temp_dir();
        root.push(format!("leakprobe-store-{}-{}", std::process::id(), tag));
        RoundStore::new(root)
    }

    fn cleanup(store: &RoundStore) {
        let _ = fs::remove_dir_all(store.root());
    }

    fn labeled_fixture(round: usize) -> LabeledTable {
        let mut table = FeatureTable::new(vec!["v".to_string()]);
        table.push_row("a", vec![1.0]);
        table.push_row("b", vec![2.0]);
        LabeledTable::new(round, table, vec![0, 1])
    }

    #[test]
    fn labeled_table_round_trips_through_the_store() {
        let store = temp_store("labels");
        let labeled = labeled_fixture(3);

        let path = store.write_labeled_table(&labeled).unwrap();
        assert!(path.ends_with("round_3/labels.csv"));

        let back = store.read_labeled_table(3).unwrap();
        assert_eq!(back, labeled);
        cleanup(&store);
    }

    #[test]
    fn embedding_file_lists_identities_with_coordinates() {
        let store = temp_store("embedding");
        let identities = vec!["a".to_string(), "b".to_string()];
        let coords = DMatrix::from_row_slice(2, 2, &[0.5, -1.0, 2.0, 3.5]);

        let path = store.write_embedding(1, &identities, &coords).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("identity,x,y\n"));
        assert!(text.contains("a,0.5,-1\n"));
        assert!(text.contains("b,2,3.5\n"));
        cleanup(&store);
    }

    #[test]
    fn round_report_and_stats_land_in_the_round_dir() {
        let store = temp_store("round");
        let record = crate::result::RoundRecord {
            round: 2,
            population: 10,
            distinct_identities: 4,
            partition: PartitionSummary::from_labels(&[0, 0, 1, -1], Some(0.4)),
            agreement: None,
            distinguishability: None,
            seed_pairs: 3,
            collision_retries: 1,
        };

        store.write_round_report(&record).unwrap();
        store.write_stats_text(&record).unwrap();

        let report = fs::read_to_string(store.round_dir(2).join("report.json")).unwrap();
        assert!(report.contains("\"population\": 10"));
        let stats = fs::read_to_string(store.round_dir(2).join("stats.txt")).unwrap();
        assert!(stats.contains("round 2"));
        cleanup(&store);
    }

    #[test]
    fn boundary_pairs_parse_back() {
        let store = temp_store("pairs");
        let pairs = vec![BoundaryPair {
            first: "a".to_string(),
            second: "b".to_string(),
            distance: 4.25,
        }];

        let path = store.write_boundary_pairs(5, &pairs).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let back: Vec<BoundaryPair> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, pairs);
        cleanup(&store);
    }
}
