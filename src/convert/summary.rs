//! Per-tile outcomes and the run summary.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::error::ConversionFailure;
use crate::tile::RowGroups;

/// What happened to one dispatched tile.
#[derive(Debug, Clone)]
pub enum TileOutcome {
    Converted {
        tile_id: String,
        target: PathBuf,
        bytes: u64,
        elapsed: Duration,
    },
    Failed(ConversionFailure),
    Skipped {
        tile_id: String,
        target: PathBuf,
        reason: String,
    },
}

impl TileOutcome {
    pub fn tile_id(&self) -> &str {
        match self {
            TileOutcome::Converted { tile_id, .. } | TileOutcome::Skipped { tile_id, .. } => {
                tile_id
            }
            TileOutcome::Failed(failure) => &failure.tile_id,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TileOutcome::Failed(_))
    }
}

/// A failed tile as reported in the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub row: String,
    pub tile_id: String,
    pub source: String,
    pub error: String,
}

/// Aggregate result of a conversion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Rows dispatched
    pub rows: usize,
    pub converted: usize,
    pub failed: usize,
    pub skipped: usize,
    pub bytes_written: u64,
    pub elapsed_secs: f64,
    pub failures: Vec<FailureRecord>,
    /// Discovered files never dispatched: no parseable id, or filed under
    /// another tile's directory. Counted in `skipped`.
    pub unmatched: Vec<String>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tile outcome into the summary.
    pub fn record(&mut self, row: &str, outcome: &TileOutcome) {
        match outcome {
            TileOutcome::Converted { bytes, .. } => {
                self.converted += 1;
                self.bytes_written += bytes;
            }
            TileOutcome::Skipped { .. } => self.skipped += 1,
            TileOutcome::Failed(failure) => {
                self.failed += 1;
                self.failures.push(FailureRecord {
                    row: row.to_string(),
                    tile_id: failure.tile_id.clone(),
                    source: failure.path.display().to_string(),
                    error: failure.cause.to_string(),
                });
            }
        }
    }

    /// Count the files discovery set aside as skipped.
    pub fn record_discovery_skips(&mut self, groups: &RowGroups) {
        let malformed = groups.malformed().iter().map(|e| e.path.clone());
        let out_of_row = groups.out_of_row().iter().map(|p| p.display().to_string());
        let before = self.unmatched.len();
        self.unmatched.extend(malformed.chain(out_of_row));
        self.skipped += self.unmatched.len() - before;
    }

    pub fn total(&self) -> usize {
        self.converted + self.failed + self.skipped
    }

    /// No dispatched tile failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the summary as pretty JSON.
    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows, {} tiles: {} converted, {} skipped, {} failed ({:.1} MB in {:.1}s)",
            self.rows,
            self.total(),
            self.converted,
            self.skipped,
            self.failed,
            self.bytes_written as f64 / (1024.0 * 1024.0),
            self.elapsed_secs
        )
    }
}
