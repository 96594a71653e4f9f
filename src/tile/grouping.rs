//! Partitioning tiles into rows.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::MalformedTileIdError;

use super::discovery::DiscoveredTiles;
use super::id::TileIdParser;

/// Tiles grouped by row id.
///
/// Every discovered row has an entry, possibly empty. Each grouped tile
/// appears in exactly one row: the row of the id in its file name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowGroups {
    groups: BTreeMap<String, Vec<PathBuf>>,
    malformed: Vec<MalformedTileIdError>,
    out_of_row: Vec<PathBuf>,
}

impl RowGroups {
    /// Group discovered tiles in a single pass over the tile list.
    ///
    /// Tiles without an id in their file name are reported as malformed;
    /// tiles whose row was not discovered are reported as out of row. Both
    /// are left out of the groups.
    pub fn build(discovered: &DiscoveredTiles, parser: &TileIdParser) -> Self {
        let mut groups: BTreeMap<String, Vec<PathBuf>> = discovered
            .rows
            .iter()
            .map(|row| (row.clone(), Vec::new()))
            .collect();
        let mut malformed = Vec::new();
        let mut out_of_row = Vec::new();

        for path in &discovered.tiles {
            let id = match parser.parse_file_name(path) {
                Ok(id) => id,
                Err(err) => {
                    warn!(path = %path.display(), "Skipping tile without id");
                    malformed.push(err);
                    continue;
                }
            };
            match groups.get_mut(id.row()) {
                Some(tiles) => tiles.push(path.clone()),
                None => {
                    warn!(path = %path.display(), row = id.row(), "Skipping tile outside discovered rows");
                    out_of_row.push(path.clone());
                }
            }
        }

        for tiles in groups.values_mut() {
            tiles.sort();
        }

        Self {
            groups,
            malformed,
            out_of_row,
        }
    }

    /// Keep only the tiles accepted by `keep`; rows are kept even if emptied.
    pub fn filter(&self, mut keep: impl FnMut(&Path) -> bool) -> Self {
        let groups = self
            .groups
            .iter()
            .map(|(row, tiles)| {
                let kept = tiles.iter().filter(|p| keep(p)).cloned().collect();
                (row.clone(), kept)
            })
            .collect();
        Self {
            groups,
            malformed: self.malformed.clone(),
            out_of_row: self.out_of_row.clone(),
        }
    }

    pub fn get(&self, row: &str) -> Option<&[PathBuf]> {
        self.groups.get(row).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Rows in ascending order with their tiles.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<PathBuf>> {
        self.groups.iter()
    }

    /// Number of rows (including empty ones).
    pub fn row_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of grouped tiles.
    pub fn tile_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tile_count() == 0
    }

    pub fn malformed(&self) -> &[MalformedTileIdError] {
        &self.malformed
    }

    pub fn out_of_row(&self) -> &[PathBuf] {
        &self.out_of_row
    }
}

impl<'a> IntoIterator for &'a RowGroups {
    type Item = (&'a String, &'a Vec<PathBuf>);
    type IntoIter = btree_map::Iter<'a, String, Vec<PathBuf>>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}
