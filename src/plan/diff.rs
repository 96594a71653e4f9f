//! Incremental resume.
//!
//! The output tree is the only record of progress. Inputs and outputs are
//! compared by canonical id: the file stem (up to the first `.`) with the
//! conversion suffix removed, reduced to the tile id it contains. A source
//! `sen2_2021_t078095.tif` and its output `sen2_2021_t078095_cog.tif` both
//! map to `078095`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::{debug, warn};

use crate::codec::OVERVIEW_FACTORS;
use crate::error::DiscoveryError;
use crate::format::validate_cog_file;
use crate::tile::{file_stem, glob_files, RowGroups, TileIdParser};

// =============================================================================
// Canonical ids
// =============================================================================

/// Canonical id of an input or output path.
///
/// Stems without a tile id map to themselves.
pub fn canonical_id(path: &Path, suffix: &str, parser: &TileIdParser) -> String {
    let stem = file_stem(path);
    let stem = stem.strip_suffix(suffix).unwrap_or(stem.as_str());
    match parser.parse(stem) {
        Ok(id) => id.as_str().to_string(),
        Err(_) => stem.to_string(),
    }
}

/// Canonical ids of a set of paths.
pub fn canonical_ids<'a>(
    paths: impl IntoIterator<Item = &'a PathBuf>,
    suffix: &str,
    parser: &TileIdParser,
) -> BTreeSet<String> {
    paths
        .into_iter()
        .map(|p| canonical_id(p, suffix, parser))
        .collect()
}

// =============================================================================
// Set operations
// =============================================================================

/// Ids present on exactly one side.
pub fn symmetric_difference(
    inputs: &BTreeSet<String>,
    outputs: &BTreeSet<String>,
) -> BTreeSet<String> {
    inputs.symmetric_difference(outputs).cloned().collect()
}

/// Inputs without an output: the tiles still to convert.
pub fn pending_ids(inputs: &BTreeSet<String>, outputs: &BTreeSet<String>) -> BTreeSet<String> {
    inputs.difference(outputs).cloned().collect()
}

/// Outputs without an input.
pub fn orphaned_ids(inputs: &BTreeSet<String>, outputs: &BTreeSet<String>) -> BTreeSet<String> {
    outputs.difference(inputs).cloned().collect()
}

/// All id sets derived from one input/output comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    pub pending: BTreeSet<String>,
    pub orphaned: BTreeSet<String>,
    pub symmetric: BTreeSet<String>,
}

impl DiffResult {
    pub fn compute(inputs: &BTreeSet<String>, outputs: &BTreeSet<String>) -> Self {
        Self {
            pending: pending_ids(inputs, outputs),
            orphaned: orphaned_ids(inputs, outputs),
            symmetric: symmetric_difference(inputs, outputs),
        }
    }
}

/// Narrow row groups to the tiles whose canonical id is pending.
pub fn restrict_to_pending(
    groups: &RowGroups,
    pending: &BTreeSet<String>,
    suffix: &str,
    parser: &TileIdParser,
) -> RowGroups {
    groups.filter(|path| pending.contains(&canonical_id(path, suffix, parser)))
}

// =============================================================================
// Existing outputs
// =============================================================================

/// Converted tiles already present under an output root.
#[derive(Debug, Clone, Default)]
pub struct ExistingOutputs {
    /// Outputs counted as done
    pub paths: Vec<PathBuf>,

    /// Outputs that failed validation, with the reason
    pub rejected: Vec<(PathBuf, String)>,
}

impl ExistingOutputs {
    /// List `{output_root}/*/*{suffix}.{extension}`.
    ///
    /// With `verify`, outputs that are not valid COGs are moved to
    /// `rejected` so they are converted again. A missing output root is an
    /// empty result.
    pub fn scan(
        output_root: &Path,
        suffix: &str,
        extension: &str,
        verify: bool,
    ) -> Result<Self, DiscoveryError> {
        let min_overviews = verify.then_some(OVERVIEW_FACTORS.len());
        Self::scan_with(output_root, suffix, extension, min_overviews)
    }

    /// Like [`scan`](Self::scan), validating each output against
    /// `min_overviews` when given.
    pub fn scan_with(
        output_root: &Path,
        suffix: &str,
        extension: &str,
        min_overviews: Option<usize>,
    ) -> Result<Self, DiscoveryError> {
        if !output_root.exists() {
            return Ok(Self::default());
        }
        if !output_root.is_dir() {
            return Err(DiscoveryError::NotADirectory(output_root.to_path_buf()));
        }

        let pattern = format!(
            "*/*{}.{}",
            Pattern::escape(suffix),
            Pattern::escape(extension)
        );
        let found = glob_files(output_root, &pattern)?;

        let mut result = Self::default();
        for path in found {
            if let Some(min_overviews) = min_overviews {
                let problem = match validate_cog_file(&path, min_overviews) {
                    Ok(check) if check.is_valid => None,
                    Ok(check) => Some(check.summary()),
                    Err(e) => Some(e.to_string()),
                };
                if let Some(reason) = problem {
                    warn!(path = %path.display(), reason = %reason, "Existing output failed validation");
                    result.rejected.push((path, reason));
                    continue;
                }
            }
            result.paths.push(path);
        }

        debug!(
            root = %output_root.display(),
            existing = result.paths.len(),
            rejected = result.rejected.len(),
            "Scanned existing outputs"
        );
        Ok(result)
    }

    pub fn ids(&self, suffix: &str, parser: &TileIdParser) -> BTreeSet<String> {
        canonical_ids(&self.paths, suffix, parser)
    }
}

// =============================================================================
// Tests
// =============================================================================
