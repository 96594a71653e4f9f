//! Asset manifest of the output tree.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DiscoveryError, RegistrationError};
use crate::plan::ExistingOutputs;
use crate::tile::{file_stem, TargetPathResolver, TileIdParser};

/// One converted tile as it will be registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Asset name: the output file stem
    pub name: String,

    /// Remote location of the output file
    pub uri: String,

    pub row: u64,
    pub col: u64,
}

/// Asset records grouped by row directory.
///
/// Serializes as `{ "<row>": [record, ...] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetManifest {
    rows: BTreeMap<String, Vec<AssetRecord>>,
}

impl AssetManifest {
    /// Build a manifest from the outputs under `output_root`.
    ///
    /// Each record's uri is `{uri_prefix}/{row}/{file_name}`. Outputs whose
    /// file name carries no tile id are left out.
    pub fn from_output_tree(
        output_root: &Path,
        resolver: &dyn TargetPathResolver,
        parser: &TileIdParser,
        uri_prefix: &str,
    ) -> Result<Self, DiscoveryError> {
        let outputs =
            ExistingOutputs::scan(output_root, resolver.suffix(), resolver.extension(), false)?;
        let prefix = uri_prefix.trim_end_matches('/');

        let mut manifest = Self::default();
        for path in &outputs.paths {
            let id = match parser.parse_file_name(path) {
                Ok(id) => id,
                Err(err) => {
                    warn!(error = %err, "Leaving output out of manifest");
                    continue;
                }
            };
            let row_dir = path
                .parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| id.row().to_string());
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            manifest.push(
                &row_dir,
                AssetRecord {
                    name: file_stem(path),
                    uri: format!("{}/{}/{}", prefix, row_dir, file_name),
                    row: id.row_number(),
                    col: id.col_number(),
                },
            );
        }

        info!(
            rows = manifest.row_count(),
            assets = manifest.asset_count(),
            "Built asset manifest"
        );
        Ok(manifest)
    }

    pub fn push(&mut self, row: &str, record: AssetRecord) {
        self.rows.entry(row.to_string()).or_default().push(record);
    }

    pub fn get(&self, row: &str) -> Option<&[AssetRecord]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<AssetRecord>> {
        self.rows.iter()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn asset_count(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn load(path: &Path) -> Result<Self, RegistrationError> {
        let text = fs::read_to_string(path).map_err(|e| RegistrationError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| RegistrationError::Manifest(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), RegistrationError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RegistrationError::Manifest(e.to_string()))?;
        fs::write(path, json).map_err(|e| RegistrationError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
