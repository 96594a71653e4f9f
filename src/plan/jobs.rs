//! Conversion jobs.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::codec::CreateOptions;
use crate::tile::{file_stem, ConversionTarget, RowGroups, TargetPathResolver, TileIdParser};

/// One tile to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub tile_id: String,
    pub source: PathBuf,
    pub target: ConversionTarget,
    pub options: CreateOptions,
}

/// Jobs per row, in ascending row order.
///
/// Rows without any job are left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobPlan {
    rows: BTreeMap<String, Vec<ConversionJob>>,
}

impl JobPlan {
    pub fn build(
        groups: &RowGroups,
        output_root: &Path,
        resolver: &dyn TargetPathResolver,
        parser: &TileIdParser,
        options: &CreateOptions,
    ) -> Self {
        let rows = groups
            .iter()
            .filter(|(_, tiles)| !tiles.is_empty())
            .map(|(row, tiles)| {
                let jobs = tiles
                    .iter()
                    .map(|source| ConversionJob {
                        tile_id: parser
                            .parse_file_name(source)
                            .map(|id| id.as_str().to_string())
                            .unwrap_or_else(|_| file_stem(source)),
                        source: source.clone(),
                        target: resolver.resolve(output_root, row, source),
                        options: options.clone(),
                    })
                    .collect();
                (row.clone(), jobs)
            })
            .collect();
        Self { rows }
    }

    pub fn get(&self, row: &str) -> Option<&[ConversionJob]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<ConversionJob>> {
        self.rows.iter()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn job_count(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Groups jobs by their target row.
impl FromIterator<ConversionJob> for JobPlan {
    fn from_iter<I: IntoIterator<Item = ConversionJob>>(iter: I) -> Self {
        let mut rows: BTreeMap<String, Vec<ConversionJob>> = BTreeMap::new();
        for job in iter {
            rows.entry(job.target.row.clone()).or_default().push(job);
        }
        Self { rows }
    }
}

impl IntoIterator for JobPlan {
    type Item = (String, Vec<ConversionJob>);
    type IntoIter = btree_map::IntoIter<String, Vec<ConversionJob>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
