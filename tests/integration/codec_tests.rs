//! Written COG tests.
//!
//! Tests verify:
//! - Outputs are tiled, LZW compressed, band interleaved, with six overviews
//! - Full-resolution pixels equal the source
//! - Georeferencing and nodata survive conversion

use std::path::PathBuf;

use gdal::Dataset;
use tempfile::TempDir;

use cogbatch::codec::{CreateOptions, GdalCodec, RasterCodec, SourceRaster, OVERVIEW_FACTORS};
use cogbatch::format::{read_levels, validate_cog_file};
use cogbatch::plan::ConversionJob;
use cogbatch::tile::ConversionTarget;
use cogbatch::{ConversionEngine, GeoTransform, OverwritePolicy, TileOutcome};

use super::test_utils::{write_geotiff, FIXTURE_BANDS, FIXTURE_PIXEL};

fn convert(dir: &TempDir, width: u32, height: u32) -> (Vec<Vec<f32>>, PathBuf) {
    let source = dir.path().join("in/tile004007/tile004007.tif");
    let data = write_geotiff(&source, width, height, 3);
    let target = dir.path().join("out/004/tile004007_cog.tif");

    let job = ConversionJob {
        tile_id: "004007".to_string(),
        source,
        target: ConversionTarget {
            row: "004".to_string(),
            path: target.clone(),
        },
        options: CreateOptions::cog(),
    };
    let engine = ConversionEngine::new(GdalCodec, OverwritePolicy::Overwrite);
    match engine.convert(&job) {
        TileOutcome::Converted { bytes, .. } => assert!(bytes > 0),
        other => panic!("conversion failed: {:?}", other),
    }
    (data, target)
}

// =============================================================================
// Layout
// =============================================================================

#[test]
fn test_output_structure() {
    let dir = TempDir::new().unwrap();
    let (_, target) = convert(&dir, 300, 200);

    let levels = read_levels(&target).unwrap();
    assert_eq!(levels.len(), 1 + OVERVIEW_FACTORS.len());

    let full = &levels[0];
    assert_eq!((full.width, full.height), (300, 200));
    assert_eq!(full.tile_width, Some(256));
    assert_eq!(full.tile_height, Some(256));
    assert_eq!(full.compression, 5);
    assert_eq!(full.samples_per_pixel, FIXTURE_BANDS as u16);
    assert_eq!(full.planar_configuration, 2);
    assert_eq!(full.subfile_type, 0);

    let expected_sizes = [(150, 100), (75, 50), (38, 25), (19, 13), (10, 7), (5, 4)];
    for (level, size) in levels[1..].iter().zip(expected_sizes) {
        assert_eq!(level.subfile_type & 1, 1);
        assert_eq!((level.width, level.height), size);
        assert!(level.tile_width.is_some());
    }

    let check = validate_cog_file(&target, OVERVIEW_FACTORS.len()).unwrap();
    assert!(check.is_valid, "{:?}", check.errors);
}

#[test]
fn test_every_band_has_overviews() {
    let dir = TempDir::new().unwrap();
    let (_, target) = convert(&dir, 300, 200);

    let dataset = Dataset::open(&target).unwrap();
    for index in 1..=FIXTURE_BANDS {
        let band = dataset.rasterband(index).unwrap();
        assert_eq!(
            band.overview_count().unwrap(),
            OVERVIEW_FACTORS.len() as i32
        );
        assert_eq!(band.overview(0).unwrap().size(), (150, 100));
    }
}

// =============================================================================
// Content
// =============================================================================

#[test]
fn test_pixels_match_source() {
    let dir = TempDir::new().unwrap();
    let (data, target) = convert(&dir, 300, 200);

    let mut output = GdalCodec.open(&target).unwrap();
    let decoded = output.read_bands().unwrap();
    assert_eq!(decoded.len(), FIXTURE_BANDS);
    assert_eq!(decoded, data);
}

#[test]
fn test_georeferencing_preserved() {
    let dir = TempDir::new().unwrap();
    let (_, target) = convert(&dir, 64, 64);

    let output = GdalCodec.open(&target).unwrap();
    assert_eq!(
        output.geo_transform(),
        Some(GeoTransform([
            530_000.0,
            FIXTURE_PIXEL,
            0.0,
            4_000_000.0,
            0.0,
            -FIXTURE_PIXEL
        ]))
    );
    assert_eq!(output.nodata(), Some(-9999.0));
    assert_eq!(output.band_count(), FIXTURE_BANDS);
    assert_eq!(output.width(), 64);

    let srs = Dataset::open(&target).unwrap().spatial_ref().unwrap();
    assert_eq!(srs.auth_code().unwrap(), 32613);
}
