//! GDAL backed codec.
//!
//! Sources are opened with whatever driver GDAL picks; outputs always go
//! through the GTiff driver in create mode. Overviews are built internally
//! once every band has been written, and the dataset is closed explicitly so
//! write errors surface instead of being lost in `Drop`.

use std::fs;
use std::path::{Path, PathBuf};

use gdal::errors::GdalError;
use gdal::raster::{Buffer, RasterCreationOptions};
use gdal::{Dataset, DriverManager};
use tracing::debug;

use crate::error::CodecError;

use super::{
    CreateOptions, GeoTransform, RasterCodec, RasterSpec, Resampling, SourceRaster, SpatialRef,
    WritableRaster,
};

const OUTPUT_DRIVER: &str = "GTiff";

fn gdal_error(path: &Path) -> impl Fn(GdalError) -> CodecError + '_ {
    move |err| CodecError::Gdal {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn dimension(value: usize, what: &str) -> Result<u32, CodecError> {
    u32::try_from(value)
        .map_err(|_| CodecError::UnsupportedLayout(format!("{} {} exceeds u32", what, value)))
}

// =============================================================================
// GdalCodec
// =============================================================================

/// Reads any GDAL raster and writes tiled GeoTIFFs with internal overviews.
#[derive(Debug, Clone, Copy, Default)]
pub struct GdalCodec;

impl RasterCodec for GdalCodec {
    type Source = GdalSource;
    type Dataset = GdalDataset;

    fn open(&self, path: &Path) -> Result<GdalSource, CodecError> {
        GdalSource::open(path)
    }

    fn create(
        &self,
        path: &Path,
        spec: RasterSpec,
        options: &CreateOptions,
    ) -> Result<GdalDataset, CodecError> {
        GdalDataset::create(path, spec, options)
    }
}

// =============================================================================
// Source
// =============================================================================

/// An opened source raster.
pub struct GdalSource {
    path: PathBuf,
    dataset: Dataset,
    width: u32,
    height: u32,
    bands: usize,
    geo_transform: Option<GeoTransform>,
    spatial_ref: Option<SpatialRef>,
    nodata: Option<f64>,
}

impl GdalSource {
    pub fn open(path: &Path) -> Result<Self, CodecError> {
        let dataset = Dataset::open(path).map_err(gdal_error(path))?;

        let (width, height) = dataset.raster_size();
        let bands = dataset.raster_count();
        if bands == 0 {
            return Err(CodecError::UnsupportedLayout(format!(
                "{} has no raster bands",
                path.display()
            )));
        }

        // a missing transform is not an error, the output is just ungeoreferenced
        let geo_transform = dataset.geo_transform().ok().map(GeoTransform);
        let spatial_ref = SpatialRef::from_wkt(dataset.projection());
        let nodata = dataset
            .rasterband(1)
            .map_err(gdal_error(path))?
            .no_data_value();

        debug!(
            path = %path.display(),
            width,
            height,
            bands,
            georeferenced = geo_transform.is_some(),
            "Opened source"
        );

        Ok(Self {
            path: path.to_path_buf(),
            width: dimension(width, "width")?,
            height: dimension(height, "height")?,
            dataset,
            bands,
            geo_transform,
            spatial_ref,
            nodata,
        })
    }
}

impl SourceRaster for GdalSource {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn band_count(&self) -> usize {
        self.bands
    }

    fn geo_transform(&self) -> Option<GeoTransform> {
        self.geo_transform
    }

    fn spatial_ref(&self) -> Option<&SpatialRef> {
        self.spatial_ref.as_ref()
    }

    fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    fn read_bands(&mut self) -> Result<Vec<Vec<f32>>, CodecError> {
        let path = self.path.as_path();
        (1..=self.bands)
            .map(|index| {
                let band = self.dataset.rasterband(index).map_err(gdal_error(path))?;
                let buffer: Buffer<f32> = band.read_band_as::<f32>().map_err(gdal_error(path))?;
                let (_, data) = buffer.into_shape_and_vec();
                Ok(data)
            })
            .collect()
    }
}

// =============================================================================
// Output Dataset
// =============================================================================

/// A GTiff dataset opened for writing.
pub struct GdalDataset {
    path: PathBuf,
    dataset: Dataset,
    spec: RasterSpec,
    written: Vec<bool>,
}

impl GdalDataset {
    pub fn create(
        path: &Path,
        spec: RasterSpec,
        options: &CreateOptions,
    ) -> Result<Self, CodecError> {
        if spec.width == 0 || spec.height == 0 || spec.bands == 0 {
            return Err(CodecError::UnsupportedLayout(format!(
                "empty raster {}x{}x{}",
                spec.width, spec.height, spec.bands
            )));
        }
        if options.tiled && (options.block_size == 0 || options.block_size % 16 != 0) {
            return Err(CodecError::UnsupportedLayout(format!(
                "block size {} is not a multiple of 16",
                options.block_size
            )));
        }

        let mut creation = RasterCreationOptions::new();
        for (name, value) in options.gtiff_options() {
            creation
                .set_name_value(name, &value)
                .map_err(gdal_error(path))?;
        }

        let driver = DriverManager::get_driver_by_name(OUTPUT_DRIVER).map_err(gdal_error(path))?;
        let dataset = driver
            .create_with_band_type_with_options::<f32, _>(
                path,
                spec.width as usize,
                spec.height as usize,
                spec.bands,
                &creation,
            )
            .map_err(gdal_error(path))?;

        Ok(Self {
            path: path.to_path_buf(),
            dataset,
            spec,
            written: vec![false; spec.bands],
        })
    }
}

impl WritableRaster for GdalDataset {
    fn set_geo_transform(&mut self, transform: GeoTransform) -> Result<(), CodecError> {
        self.dataset
            .set_geo_transform(&transform.0)
            .map_err(gdal_error(&self.path))
    }

    fn set_spatial_ref(&mut self, srs: &SpatialRef) -> Result<(), CodecError> {
        self.dataset
            .set_projection(srs.wkt())
            .map_err(gdal_error(&self.path))
    }

    fn set_nodata(&mut self, nodata: f64) -> Result<(), CodecError> {
        for index in 1..=self.spec.bands {
            let mut band = self
                .dataset
                .rasterband(index)
                .map_err(gdal_error(&self.path))?;
            band.set_no_data_value(Some(nodata))
                .map_err(gdal_error(&self.path))?;
        }
        Ok(())
    }

    fn write_band(&mut self, index: usize, data: &[f32]) -> Result<(), CodecError> {
        if index >= self.spec.bands {
            return Err(CodecError::BandIndex {
                index,
                bands: self.spec.bands,
            });
        }
        let shape = (self.spec.width as usize, self.spec.height as usize);
        let expected = shape.0 * shape.1;
        if data.len() != expected {
            return Err(CodecError::BandSize {
                index,
                expected,
                actual: data.len(),
            });
        }

        let mut band = self
            .dataset
            .rasterband(index + 1)
            .map_err(gdal_error(&self.path))?;
        let mut buffer = Buffer::new(shape, data.to_vec());
        band.write((0, 0), shape, &mut buffer)
            .map_err(gdal_error(&self.path))?;
        self.written[index] = true;
        Ok(())
    }

    fn build_overviews(
        &mut self,
        resampling: Resampling,
        factors: &[u32],
    ) -> Result<(), CodecError> {
        if self.written.iter().any(|w| !w) {
            return Err(CodecError::State(
                "overviews requested before all bands were written",
            ));
        }
        let levels = factors
            .iter()
            .map(|&f| i32::try_from(f))
            .collect::<Result<Vec<i32>, _>>()
            .map_err(|_| CodecError::UnsupportedLayout("overview factor exceeds i32".into()))?;
        if levels.iter().any(|&f| f < 2) {
            return Err(CodecError::UnsupportedLayout(
                "overview factors must be at least 2".to_string(),
            ));
        }

        self.dataset
            .build_overviews(resampling.gdal_name(), &levels, &[])
            .map_err(gdal_error(&self.path))
    }

    fn close(self) -> Result<u64, CodecError> {
        let Self { path, dataset, .. } = self;
        dataset.close().map_err(gdal_error(&path))?;

        let bytes = fs::metadata(&path)
            .map_err(|e| CodecError::Io {
                path: path.clone(),
                message: e.to_string(),
            })?
            .len();
        debug!(path = %path.display(), bytes, "Closed output");
        Ok(bytes)
    }
}

// =============================================================================
// Tests
// =============================================================================
