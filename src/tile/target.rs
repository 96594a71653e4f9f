//! Output path convention.

use std::path::{Path, PathBuf};

/// Suffix appended to converted tile stems.
pub const COG_SUFFIX: &str = "_cog";

/// Extension of converted tiles.
pub const COG_EXTENSION: &str = "tif";

/// Where a converted tile is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionTarget {
    /// Row directory the output lives in
    pub row: String,

    /// Full output path
    pub path: PathBuf,
}

impl ConversionTarget {
    /// The row directory (parent of the output file).
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }
}

/// Maps a source tile to its output location.
pub trait TargetPathResolver: Send + Sync {
    fn resolve(&self, output_root: &Path, row: &str, source: &Path) -> ConversionTarget;

    /// Suffix added to the source stem.
    fn suffix(&self) -> &str;

    /// Extension of outputs, without the dot.
    fn extension(&self) -> &str;
}

/// Source file name up to its first `.`.
pub fn file_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.split_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => name,
    }
}

/// `{output_root}/{row}/{stem}{suffix}.{extension}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CogSuffixResolver {
    suffix: String,
    extension: String,
}

impl CogSuffixResolver {
    pub fn new(suffix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            extension: extension.into(),
        }
    }
}

impl Default for CogSuffixResolver {
    fn default() -> Self {
        Self::new(COG_SUFFIX, COG_EXTENSION)
    }
}

impl TargetPathResolver for CogSuffixResolver {
    fn resolve(&self, output_root: &Path, row: &str, source: &Path) -> ConversionTarget {
        let name = format!("{}{}.{}", file_stem(source), self.suffix, self.extension);
        ConversionTarget {
            row: row.to_string(),
            path: output_root.join(row).join(name),
        }
    }

    fn suffix(&self) -> &str {
        &self.suffix
    }

    fn extension(&self) -> &str {
        &self.extension
    }
}
