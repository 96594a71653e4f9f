//! Row-paced asset registration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::RegistrationError;

use super::client::AssetClient;
use super::manifest::{AssetManifest, AssetRecord};
use super::request::AssetRequest;

/// Result of a registration run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationSummary {
    pub rows: usize,
    pub registered: usize,
    pub failed: usize,
    /// Names of the assets that failed
    pub failures: Vec<String>,
}

impl RegistrationSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Registers every record of a manifest, one row at a time.
pub struct Registrar<A> {
    client: A,
    log_dir: PathBuf,
    row_pause: Duration,
}

impl<A: AssetClient> Registrar<A> {
    pub fn new(client: A, log_dir: impl Into<PathBuf>, row_pause: Duration) -> Self {
        Self {
            client,
            log_dir: log_dir.into(),
            row_pause,
        }
    }

    pub fn client(&self) -> &A {
        &self.client
    }

    /// Response log file of a record.
    pub fn log_path(&self, record: &AssetRecord) -> PathBuf {
        self.log_dir
            .join(record.row.to_string())
            .join(format!("{}-{}-response.json", record.row, record.col))
    }

    /// Register all records. A failed record is logged and counted; the
    /// rest continue.
    pub async fn run(&self, manifest: &AssetManifest) -> RegistrationSummary {
        let mut summary = RegistrationSummary::default();
        let row_count = manifest.row_count();

        for (index, (row, records)) in manifest.iter().enumerate() {
            for record in records {
                match self.register(record).await {
                    Ok(()) => summary.registered += 1,
                    Err(e) => {
                        warn!(asset = %record.name, error = %e, "Asset registration failed");
                        summary.failed += 1;
                        summary.failures.push(record.name.clone());
                    }
                }
            }
            summary.rows += 1;
            info!(
                row = %row,
                assets = records.len(),
                "Registered row {}/{}",
                index + 1,
                row_count
            );

            if index + 1 < row_count && !self.row_pause.is_zero() {
                tokio::time::sleep(self.row_pause).await;
            }
        }
        summary
    }

    async fn register(&self, record: &AssetRecord) -> Result<(), RegistrationError> {
        let request = AssetRequest::image(record);
        let response = self.client.create_asset(&record.name, &request).await?;

        let log_path = self.log_path(record);
        write_log(&log_path, &response.body)?;
        debug!(
            asset = %record.name,
            status = response.status,
            log = %log_path.display(),
            "Asset response"
        );

        if response.is_success() {
            Ok(())
        } else {
            Err(RegistrationError::Http(format!(
                "status {} for {}",
                response.status, record.name
            )))
        }
    }
}

fn write_log(path: &Path, body: &[u8]) -> Result<(), RegistrationError> {
    let io_error = |e: std::io::Error| RegistrationError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, body).map_err(io_error)
}
