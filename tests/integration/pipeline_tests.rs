//! End-to-end conversion tests.
//!
//! Tests verify:
//! - Discovery, grouping and output layout for a small mosaic
//! - Resume dispatches only the missing tiles
//! - One unreadable source fails alone
//! - Orphaned outputs are reported

use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use cogbatch::{
    CogSuffixResolver, ConversionEngine, CreateOptions, Dispatcher, DirectoryListing, GdalCodec,
    OverwritePolicy, PatternGlob, PlanReport, Planner, ResumeMode, TileDiscoverer, TileIdParser,
};

use super::test_utils::{is_tiff_le, write_raw, write_tile_tree};

const IDS: [&str; 3] = ["001001", "001002", "002001"];

fn plan(
    discoverer: &dyn TileDiscoverer,
    input: &Path,
    output: &Path,
    resume: bool,
) -> PlanReport {
    let parser = TileIdParser::new(6).unwrap();
    let resolver = CogSuffixResolver::default();
    Planner {
        discoverer,
        parser: &parser,
        resolver: &resolver,
        options: CreateOptions::cog(),
    }
    .plan(
        input,
        output,
        ResumeMode {
            enabled: resume,
            verify: true,
        },
    )
    .unwrap()
}

fn dispatcher(workers: usize) -> Dispatcher<GdalCodec> {
    Dispatcher::new(
        ConversionEngine::new(GdalCodec, OverwritePolicy::Overwrite),
        workers,
        Duration::ZERO,
    )
}

fn directory_listing() -> DirectoryListing {
    DirectoryListing::new(TileIdParser::new(6).unwrap(), "**/*.tif")
}

// =============================================================================
// Discovery and Layout
// =============================================================================

#[tokio::test]
async fn test_end_to_end_layout() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    write_tile_tree(&input, &IDS, 32);

    let report = plan(&directory_listing(), &input, &output, true);

    let rows: Vec<&str> = report.groups.rows().collect();
    assert_eq!(rows, vec!["001", "002"]);
    assert_eq!(report.groups.get("001").unwrap().len(), 2);
    assert_eq!(report.groups.get("002").unwrap().len(), 1);
    assert_eq!(report.plan.job_count(), 3);

    let summary = dispatcher(2).run(report.plan).await;
    assert_eq!(summary.converted, 3);
    assert!(summary.is_success());

    for relative in [
        "001/tile001001_cog.tif",
        "001/tile001002_cog.tif",
        "002/tile002001_cog.tif",
    ] {
        let path = output.join(relative);
        assert!(path.exists(), "missing {}", relative);
        assert!(is_tiff_le(&path));
    }
}

#[tokio::test]
async fn test_glob_mode_matches_directory_mode() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in");
    write_tile_tree(&input, &IDS, 16);

    let by_dirs = plan(&directory_listing(), &input, &dir.path().join("a"), true);
    let by_glob = plan(
        &PatternGlob::new(TileIdParser::new(6).unwrap(), "**/*.tif"),
        &input,
        &dir.path().join("a"),
        true,
    );
    assert_eq!(by_dirs.groups, by_glob.groups);
}

#[tokio::test]
async fn test_malformed_tiles_are_skipped() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in");
    write_tile_tree(&input, &IDS, 16);
    write_raw(&input.join("tile001001/preview.tif"), b"not a tile");

    let report = plan(&directory_listing(), &input, &dir.path().join("out"), true);
    assert_eq!(report.groups.malformed().len(), 1);
    assert_eq!(report.plan.job_count(), 3);

    let mut summary = dispatcher(2).run(report.plan).await;
    summary.record_discovery_skips(&report.groups);
    assert_eq!(summary.converted, 3);
    assert_eq!(summary.skipped, 1);
    assert!(summary.unmatched[0].ends_with("preview.tif"));
    assert!(summary.is_success());
}

// =============================================================================
// Resume
// =============================================================================

#[tokio::test]
async fn test_resume_dispatches_only_missing_tile() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    write_tile_tree(&input, &IDS, 32);

    // first run converts row 001 only
    let first = plan(&directory_listing(), &input, &output, true);
    let partial: cogbatch::JobPlan = first
        .plan
        .iter()
        .filter(|(row, _)| row.as_str() == "001")
        .flat_map(|(_, jobs)| jobs.iter().cloned())
        .collect();
    let summary = dispatcher(2).run(partial).await;
    assert_eq!(summary.converted, 2);

    let second = plan(&directory_listing(), &input, &output, true);
    assert_eq!(second.existing.paths.len(), 2);
    assert_eq!(second.plan.job_count(), 1);
    assert_eq!(second.plan.get("002").unwrap()[0].tile_id, "002001");

    let summary = dispatcher(2).run(second.plan).await;
    assert_eq!(summary.total(), 1);
    assert_eq!(summary.converted, 1);

    let third = plan(&directory_listing(), &input, &output, true);
    assert!(third.plan.is_empty());
}

#[tokio::test]
async fn test_corrupt_output_is_redone() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    write_tile_tree(&input, &IDS, 16);
    write_raw(&output.join("001/tile001001_cog.tif"), b"truncated");

    let report = plan(&directory_listing(), &input, &output, true);
    assert_eq!(report.existing.rejected.len(), 1);
    assert_eq!(report.plan.job_count(), 3);

    let summary = dispatcher(1).run(report.plan).await;
    assert_eq!(summary.converted, 3);
    assert!(is_tiff_le(&output.join("001/tile001001_cog.tif")));
}

#[tokio::test]
async fn test_no_resume_converts_everything() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    write_tile_tree(&input, &IDS, 16);

    let summary = dispatcher(2)
        .run(plan(&directory_listing(), &input, &output, true).plan)
        .await;
    assert_eq!(summary.converted, 3);

    let again = plan(&directory_listing(), &input, &output, false);
    assert_eq!(again.plan.job_count(), 3);
}

// =============================================================================
// Failure Isolation
// =============================================================================

#[tokio::test]
async fn test_unreadable_source_fails_alone() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    write_tile_tree(&input, &IDS, 16);
    write_raw(&input.join("tile001002/tile001002.tif"), b"not a tiff");

    let report = plan(&directory_listing(), &input, &output, true);
    let summary = dispatcher(3).run(report.plan).await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.converted, 2);
    assert_eq!(summary.failures[0].tile_id, "001002");
    assert!(!output.join("001/tile001002_cog.tif").exists());
    assert!(output.join("002/tile002001_cog.tif").exists());

    let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
    assert_eq!(json["failed"], 1);
}

#[tokio::test]
async fn test_skip_existing_policy() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    write_tile_tree(&input, &IDS, 16);
    write_raw(&output.join("002/tile002001_cog.tif"), b"keep me");

    let report = plan(&directory_listing(), &input, &output, false);
    let dispatcher = Dispatcher::new(
        ConversionEngine::new(GdalCodec, OverwritePolicy::SkipExisting),
        2,
        Duration::ZERO,
    );
    let summary = dispatcher.run(report.plan).await;

    assert_eq!(summary.converted, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        fs::read(output.join("002/tile002001_cog.tif")).unwrap(),
        b"keep me"
    );
}

// =============================================================================
// Orphans
// =============================================================================

#[test]
fn test_orphaned_outputs() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    write_tile_tree(&input, &IDS, 8);
    write_raw(&output.join("001/tile001001_cog.tif"), b"x");
    write_raw(&output.join("003/tile003007_cog.tif"), b"x");

    let parser = TileIdParser::new(6).unwrap();
    let discoverer = directory_listing();
    let resolver = CogSuffixResolver::default();
    let orphans = Planner {
        discoverer: &discoverer,
        parser: &parser,
        resolver: &resolver,
        options: CreateOptions::cog(),
    }
    .orphans(&input, &output)
    .unwrap();

    assert_eq!(orphans, vec![output.join("003/tile003007_cog.tif")]);
}
