//! Test utilities for integration tests.
//!
//! GeoTIFF fixtures are written through GDAL; written COGs are inspected
//! with the crate's validator and read back through GDAL.

use async_trait::async_trait;
use bytes::Bytes;
use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::DriverManager;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cogbatch::error::RegistrationError;
use cogbatch::register::{AssetClient, AssetRequest, AssetResponse};

// =============================================================================
// GeoTIFF Fixtures
// =============================================================================

/// Pixel size of fixture tiles.
pub const FIXTURE_PIXEL: f64 = 10.0;

/// Bands in every fixture tile.
pub const FIXTURE_BANDS: usize = 2;

/// Deterministic pixel values for one band of a fixture tile.
pub fn fixture_pixels(width: u32, height: u32, seed: u32, band: usize) -> Vec<f32> {
    (0..width * height)
        .map(|i| (i % 251) as f32 + seed as f32 * 1000.0 + band as f32 * 0.5)
        .collect()
}

/// Write a two-band Float32 GeoTIFF in UTM 13N with nodata -9999.
///
/// The origin is derived from `seed` so different tiles carry different
/// transforms. Returns the pixels of each band.
pub fn write_geotiff(path: &Path, width: u32, height: u32, seed: u32) -> Vec<Vec<f32>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let origin_x = 500_000.0 + seed as f64 * 10_000.0;
    let size = (width as usize, height as usize);

    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver
        .create_with_band_type::<f32, _>(path, size.0, size.1, FIXTURE_BANDS)
        .unwrap();
    dataset
        .set_geo_transform(&[origin_x, FIXTURE_PIXEL, 0.0, 4_000_000.0, 0.0, -FIXTURE_PIXEL])
        .unwrap();
    dataset
        .set_spatial_ref(&SpatialRef::from_epsg(32613).unwrap())
        .unwrap();

    let mut bands = Vec::with_capacity(FIXTURE_BANDS);
    for index in 0..FIXTURE_BANDS {
        let data = fixture_pixels(width, height, seed, index);
        let mut band = dataset.rasterband(index + 1).unwrap();
        band.set_no_data_value(Some(-9999.0)).unwrap();
        let mut buffer = Buffer::new(size, data.clone());
        band.write((0, 0), size, &mut buffer).unwrap();
        bands.push(data);
    }
    dataset.close().unwrap();
    bands
}

/// Write `bytes` to `path`, creating parent directories.
pub fn write_raw(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
}

/// Input tree laid out as `{root}/tile{id}/tile{id}.tif`.
pub fn write_tile_tree(root: &Path, ids: &[&str], size: u32) -> Vec<PathBuf> {
    ids.iter()
        .enumerate()
        .map(|(seed, id)| {
            let path = root.join(format!("tile{}", id)).join(format!("tile{}.tif", id));
            write_geotiff(&path, size, size, seed as u32);
            path
        })
        .collect()
}

// =============================================================================
// Mock Asset Client
// =============================================================================

/// An asset client that records every request and answers from a script.
#[derive(Default)]
pub struct RecordingAssetClient {
    requests: Mutex<Vec<(String, AssetRequest)>>,
    failing: Vec<String>,
}

impl RecordingAssetClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer 409 for the given asset names.
    pub fn failing_on(names: &[&str]) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            failing: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn requests(&self) -> Vec<(String, AssetRequest)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetClient for RecordingAssetClient {
    async fn create_asset(
        &self,
        name: &str,
        request: &AssetRequest,
    ) -> Result<AssetResponse, RegistrationError> {
        self.requests
            .lock()
            .unwrap()
            .push((name.to_string(), request.clone()));

        if self.failing.iter().any(|n| n == name) {
            return Ok(AssetResponse {
                status: 409,
                body: Bytes::from_static(b"{\"error\":{\"code\":409,\"status\":\"ALREADY_EXISTS\"}}"),
            });
        }
        Ok(AssetResponse {
            status: 200,
            body: Bytes::from(format!("{{\"name\":\"projects/p/assets/c/{}\"}}", name)),
        })
    }
}

/// Whether a file starts with a little-endian TIFF header.
pub fn is_tiff_le(path: &Path) -> bool {
    let bytes = fs::read(path).unwrap();
    bytes.len() >= 4 && bytes[0] == b'I' && bytes[1] == b'I' && bytes[2] == 42
}
