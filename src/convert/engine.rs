//! Single-tile conversion.

use std::fs;
use std::time::Instant;

use tracing::debug;

use crate::codec::{
    RasterCodec, RasterSpec, Resampling, SourceRaster, WritableRaster, OVERVIEW_FACTORS,
};
use crate::config::OverwritePolicy;
use crate::error::{CodecError, ConversionFailure, TargetDirectoryError};
use crate::plan::ConversionJob;
use crate::tile::ConversionTarget;

use super::summary::TileOutcome;

/// Converts one tile at a time through a [`RasterCodec`].
///
/// The engine holds no per-job state and is shared by every worker.
#[derive(Debug, Clone)]
pub struct ConversionEngine<C> {
    codec: C,
    overwrite: OverwritePolicy,
}

impl<C: RasterCodec> ConversionEngine<C> {
    pub fn new(codec: C, overwrite: OverwritePolicy) -> Self {
        Self { codec, overwrite }
    }

    /// Create the target's row directory.
    ///
    /// Succeeds when the directory already exists, including when another
    /// worker creates it concurrently.
    pub fn prepare_directory(target: &ConversionTarget) -> Result<(), TargetDirectoryError> {
        let directory = target.directory();
        fs::create_dir_all(directory).map_err(|e| TargetDirectoryError {
            path: directory.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Convert one job. Never panics on codec errors; they become
    /// [`TileOutcome::Failed`].
    pub fn convert(&self, job: &ConversionJob) -> TileOutcome {
        let started = Instant::now();
        let fail = |cause| {
            TileOutcome::Failed(ConversionFailure {
                tile_id: job.tile_id.clone(),
                path: job.source.clone(),
                cause,
            })
        };

        if let Err(err) = Self::prepare_directory(&job.target) {
            return fail(err.into());
        }

        if self.overwrite == OverwritePolicy::SkipExisting && job.target.path.exists() {
            debug!(tile = %job.tile_id, target = %job.target.path.display(), "Output exists, skipping");
            return TileOutcome::Skipped {
                tile_id: job.tile_id.clone(),
                target: job.target.path.clone(),
                reason: "output already exists".to_string(),
            };
        }

        match self.transcode(job) {
            Ok(bytes) => {
                let elapsed = started.elapsed();
                debug!(
                    tile = %job.tile_id,
                    target = %job.target.path.display(),
                    bytes,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Converted tile"
                );
                TileOutcome::Converted {
                    tile_id: job.tile_id.clone(),
                    target: job.target.path.clone(),
                    bytes,
                    elapsed,
                }
            }
            Err(err) => fail(err.into()),
        }
    }

    fn transcode(&self, job: &ConversionJob) -> Result<u64, CodecError> {
        let mut source = self.codec.open(&job.source)?;
        let spec = RasterSpec {
            width: source.width(),
            height: source.height(),
            bands: source.band_count(),
        };
        let bands = source.read_bands()?;

        let mut dataset = self.codec.create(&job.target.path, spec, &job.options)?;
        if let Some(transform) = source.geo_transform() {
            dataset.set_geo_transform(transform)?;
        }
        if let Some(srs) = source.spatial_ref() {
            dataset.set_spatial_ref(srs)?;
        }
        if let Some(nodata) = source.nodata() {
            dataset.set_nodata(nodata)?;
        }
        for (index, band) in bands.iter().enumerate() {
            dataset.write_band(index, band)?;
        }
        dataset.build_overviews(Resampling::Nearest, &OVERVIEW_FACTORS)?;
        let bytes = dataset.close()?;

        drop(source);
        Ok(bytes)
    }
}
