//! Raster codec abstraction.
//!
//! The conversion engine talks to raster files only through the traits in
//! this module, so the pipeline can be driven by any codec (and by an
//! in-memory fake in tests).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           ConversionEngine              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           RasterCodec Trait             │
//! │   open() -> SourceRaster                │
//! │   create() -> WritableRaster            │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              GdalCodec                  │
//! │  (GTiff driver through the gdal crate)  │
//! └─────────────────────────────────────────┘
//! ```

mod gdal_codec;

use std::path::Path;

use crate::error::CodecError;

pub use gdal_codec::{GdalCodec, GdalDataset, GdalSource};

/// Overview decimation factors built for every output.
pub const OVERVIEW_FACTORS: [u32; 6] = [2, 4, 8, 16, 32, 64];

/// Block edge length of tiled outputs.
pub const COG_BLOCK_SIZE: u32 = 256;

// =============================================================================
// Georeferencing
// =============================================================================

/// Affine pixel to model transform in GDAL coefficient order:
/// `[origin_x, pixel_width, row_rotation, origin_y, column_rotation, pixel_height]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

/// Coordinate reference system as WKT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialRef(String);

impl SpatialRef {
    /// `None` for an empty definition.
    pub fn from_wkt(wkt: impl Into<String>) -> Option<Self> {
        let wkt = wkt.into();
        (!wkt.trim().is_empty()).then_some(Self(wkt))
    }

    pub fn wkt(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Options
// =============================================================================

/// Block compression of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Lzw,
    Deflate,
}

impl Compression {
    /// Value of the GTiff `COMPRESS` creation option.
    pub const fn gdal_name(self) -> &'static str {
        match self {
            Compression::None => "NONE",
            Compression::Lzw => "LZW",
            Compression::Deflate => "DEFLATE",
        }
    }
}

/// How samples of different bands are arranged on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interleave {
    /// All bands of a pixel together
    Pixel,
    /// One plane per band
    Band,
}

impl Interleave {
    /// Value of the GTiff `INTERLEAVE` creation option.
    pub const fn gdal_name(self) -> &'static str {
        match self {
            Interleave::Pixel => "PIXEL",
            Interleave::Band => "BAND",
        }
    }
}

/// Overview resampling method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resampling {
    Nearest,
}

impl Resampling {
    pub const fn gdal_name(self) -> &'static str {
        match self {
            Resampling::Nearest => "NEAREST",
        }
    }
}

/// Dimensions of a raster to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterSpec {
    pub width: u32,
    pub height: u32,
    pub bands: usize,
}

/// Creation options for an output raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    pub tiled: bool,
    pub block_size: u32,
    pub compression: Compression,
    pub interleave: Interleave,
}

impl CreateOptions {
    /// Tiled, LZW compressed, band interleaved.
    pub fn cog() -> Self {
        Self {
            tiled: true,
            block_size: COG_BLOCK_SIZE,
            compression: Compression::Lzw,
            interleave: Interleave::Band,
        }
    }

    /// GTiff creation options as `(name, value)` pairs.
    pub fn gtiff_options(&self) -> Vec<(&'static str, String)> {
        let mut options = vec![
            ("COMPRESS", self.compression.gdal_name().to_string()),
            ("INTERLEAVE", self.interleave.gdal_name().to_string()),
            ("BIGTIFF", "IF_SAFER".to_string()),
        ];
        if self.tiled {
            options.push(("TILED", "YES".to_string()));
            options.push(("BLOCKXSIZE", self.block_size.to_string()));
            options.push(("BLOCKYSIZE", self.block_size.to_string()));
        }
        options
    }
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self::cog()
    }
}

// =============================================================================
// Traits
// =============================================================================

/// An opened source raster.
pub trait SourceRaster {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn band_count(&self) -> usize;

    fn geo_transform(&self) -> Option<GeoTransform>;

    fn spatial_ref(&self) -> Option<&SpatialRef>;

    fn nodata(&self) -> Option<f64>;

    /// Read every band as `f32`, one `width * height` buffer per band.
    fn read_bands(&mut self) -> Result<Vec<Vec<f32>>, CodecError>;
}

/// A raster being written.
///
/// All bands must be written before overviews are built; `close` flushes the
/// file and consumes the dataset.
pub trait WritableRaster {
    fn set_geo_transform(&mut self, transform: GeoTransform) -> Result<(), CodecError>;

    fn set_spatial_ref(&mut self, srs: &SpatialRef) -> Result<(), CodecError>;

    fn set_nodata(&mut self, nodata: f64) -> Result<(), CodecError>;

    /// Write band `index` (0-based) from a `width * height` buffer.
    fn write_band(&mut self, index: usize, data: &[f32]) -> Result<(), CodecError>;

    fn build_overviews(&mut self, resampling: Resampling, factors: &[u32])
        -> Result<(), CodecError>;

    /// Flush to disk and return the number of bytes written.
    fn close(self) -> Result<u64, CodecError>;
}

/// Opens source rasters and creates output rasters.
///
/// Codecs are shared across worker threads.
pub trait RasterCodec: Send + Sync + 'static {
    type Source: SourceRaster;
    type Dataset: WritableRaster;

    fn open(&self, path: &Path) -> Result<Self::Source, CodecError>;

    fn create(
        &self,
        path: &Path,
        spec: RasterSpec,
        options: &CreateOptions,
    ) -> Result<Self::Dataset, CodecError>;
}
