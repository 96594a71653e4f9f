//! Tile discovery.
//!
//! Two strategies find the source tiles under an input root:
//!
//! - [`DirectoryListing`]: rows are the immediate subdirectories of the root
//!   whose names carry a tile id; tiles are the files matching the glob
//!   pattern under the root.
//! - [`PatternGlob`]: tiles are the files matching the glob pattern; rows
//!   are derived from the tile file names.
//!
//! Discovery only reads the filesystem. Tiles are returned sorted; deciding
//! which tile belongs to which row (and reporting the ones that fit nowhere)
//! is left to [`RowGroups`](super::RowGroups).

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::{debug, warn};

use crate::error::{DiscoveryError, MalformedTileIdError};

use super::id::TileIdParser;

/// Default glob pattern, relative to the input root.
pub const DEFAULT_PATTERN: &str = "**/*.tif";

/// Result of discovering an input root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveredTiles {
    /// Row ids, sorted
    pub rows: BTreeSet<String>,

    /// Matched tile paths, sorted
    pub tiles: Vec<PathBuf>,

    /// Entries skipped because they carry no tile id
    pub malformed: Vec<MalformedTileIdError>,
}

impl DiscoveredTiles {
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// A strategy for finding tiles under an input root.
pub trait TileDiscoverer: Send + Sync {
    fn discover(&self, root: &Path) -> Result<DiscoveredTiles, DiscoveryError>;
}

// =============================================================================
// Shared helpers
// =============================================================================

fn check_root(root: &Path) -> Result<(), DiscoveryError> {
    if !root.exists() {
        return Err(DiscoveryError::RootMissing(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(DiscoveryError::NotADirectory(root.to_path_buf()));
    }
    Ok(())
}

/// Files under `root` matching `pattern`, sorted.
pub fn glob_files(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let full = format!(
        "{}/{}",
        Pattern::escape(&root.to_string_lossy()),
        pattern.trim_start_matches('/')
    );
    let paths = glob::glob(&full).map_err(|e| DiscoveryError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!(path = %e.path().display(), error = %e.error(), "Skipping unreadable path"),
        }
    }
    files.sort();
    Ok(files)
}

// =============================================================================
// DirectoryListing
// =============================================================================

/// Rows from subdirectory names, tiles from the glob pattern.
#[derive(Debug, Clone)]
pub struct DirectoryListing {
    parser: TileIdParser,
    pattern: String,
}

impl DirectoryListing {
    pub fn new(parser: TileIdParser, pattern: impl Into<String>) -> Self {
        Self {
            parser,
            pattern: pattern.into(),
        }
    }
}

impl TileDiscoverer for DirectoryListing {
    fn discover(&self, root: &Path) -> Result<DiscoveredTiles, DiscoveryError> {
        check_root(root)?;

        let unreadable = |e: std::io::Error| DiscoveryError::Unreadable {
            path: root.to_path_buf(),
            message: e.to_string(),
        };

        let mut result = DiscoveredTiles::default();
        for entry in fs::read_dir(root).map_err(unreadable)? {
            let entry = entry.map_err(unreadable)?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            match self.parser.parse(&name) {
                Ok(id) => {
                    result.rows.insert(id.row().to_string());
                }
                Err(err) => {
                    warn!(directory = %name, "Skipping directory without tile id");
                    result.malformed.push(err);
                }
            }
        }

        result.tiles = glob_files(root, &self.pattern)?;

        debug!(
            root = %root.display(),
            rows = result.rows.len(),
            tiles = result.tiles.len(),
            "Listed input directories"
        );
        Ok(result)
    }
}

// =============================================================================
// PatternGlob
// =============================================================================

/// Tiles from the glob pattern, rows from tile file names.
#[derive(Debug, Clone)]
pub struct PatternGlob {
    parser: TileIdParser,
    pattern: String,
}

impl PatternGlob {
    pub fn new(parser: TileIdParser, pattern: impl Into<String>) -> Self {
        Self {
            parser,
            pattern: pattern.into(),
        }
    }
}

impl TileDiscoverer for PatternGlob {
    fn discover(&self, root: &Path) -> Result<DiscoveredTiles, DiscoveryError> {
        check_root(root)?;

        let tiles = glob_files(root, &self.pattern)?;
        let rows = tiles
            .iter()
            .filter_map(|path| self.parser.parse_file_name(path).ok())
            .map(|id| id.row().to_string())
            .collect();

        debug!(root = %root.display(), tiles = tiles.len(), "Globbed input tiles");
        Ok(DiscoveredTiles {
            rows,
            tiles,
            malformed: Vec::new(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
