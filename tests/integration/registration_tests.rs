//! Manifest and registration tests.
//!
//! Tests verify:
//! - A manifest built from a converted tree lists every output by row
//! - Every record is registered with its own request body
//! - Responses are logged per tile and rejected assets are counted

use std::fs;
use std::time::Duration;

use tempfile::TempDir;

use cogbatch::{AssetManifest, CogSuffixResolver, Registrar, TileIdParser};

use super::test_utils::{write_raw, RecordingAssetClient};

fn output_tree(dir: &TempDir) -> std::path::PathBuf {
    let output = dir.path().join("out");
    for relative in [
        "078/sen2_l2a_t078095_cog.tif",
        "078/sen2_l2a_t078096_cog.tif",
        "090/sen2_l2a_t090074_cog.tif",
    ] {
        write_raw(&output.join(relative), b"cog");
    }
    output
}

fn manifest(dir: &TempDir) -> AssetManifest {
    AssetManifest::from_output_tree(
        &output_tree(dir),
        &CogSuffixResolver::default(),
        &TileIdParser::new(6).unwrap(),
        "gs://cogs-bucket/basin",
    )
    .unwrap()
}

#[test]
fn test_manifest_from_converted_tree() {
    let dir = TempDir::new().unwrap();
    let manifest = manifest(&dir);

    assert_eq!(manifest.row_count(), 2);
    let row = manifest.get("078").unwrap();
    assert_eq!(row.len(), 2);
    assert_eq!(row[1].name, "sen2_l2a_t078096_cog");
    assert_eq!(row[1].uri, "gs://cogs-bucket/basin/078/sen2_l2a_t078096_cog.tif");
    assert_eq!((row[1].row, row[1].col), (78, 96));

    let path = dir.path().join("manifest.json");
    manifest.save(&path).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(json["090"][0]["col"], 74);
}

#[tokio::test]
async fn test_register_all_assets() {
    let dir = TempDir::new().unwrap();
    let manifest = manifest(&dir);
    let logs = dir.path().join("logging");

    let client = RecordingAssetClient::new();
    let registrar = Registrar::new(client, &logs, Duration::ZERO);
    let summary = registrar.run(&manifest).await;

    assert_eq!(summary.rows, 2);
    assert_eq!(summary.registered, 3);
    assert!(summary.is_success());

    assert!(logs.join("78/78-95-response.json").exists());
    assert!(logs.join("78/78-96-response.json").exists());
    let body = fs::read_to_string(logs.join("90/90-74-response.json")).unwrap();
    assert!(body.contains("sen2_l2a_t090074_cog"));
}

#[tokio::test]
async fn test_requests_are_per_asset() {
    let dir = TempDir::new().unwrap();
    let manifest = manifest(&dir);
    let registrar = Registrar::new(
        RecordingAssetClient::new(),
        dir.path().join("logging"),
        Duration::ZERO,
    );
    registrar.run(&manifest).await;

    let requests = registrar.client().requests();
    assert_eq!(requests.len(), 3);
    for (name, request) in &requests {
        assert_eq!(request.kind, "IMAGE");
        assert_eq!(request.gcs_location.uris.len(), 1);
        assert!(request.gcs_location.uris[0].ends_with(&format!("{}.tif", name)));
    }
    assert_eq!(requests[0].1.properties.col, 95);
    assert_eq!(requests[1].1.properties.col, 96);
    assert_eq!(requests[2].1.properties.row, 90);
}

#[tokio::test]
async fn test_rejected_asset_does_not_stop_run() {
    let dir = TempDir::new().unwrap();
    let manifest = manifest(&dir);
    let logs = dir.path().join("logging");

    let client = RecordingAssetClient::failing_on(&["sen2_l2a_t078095_cog"]);
    let registrar = Registrar::new(client, &logs, Duration::ZERO);
    let summary = registrar.run(&manifest).await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.registered, 2);
    assert_eq!(summary.failures, vec!["sen2_l2a_t078095_cog"]);

    let body = fs::read_to_string(logs.join("78/78-95-response.json")).unwrap();
    assert!(body.contains("ALREADY_EXISTS"));
}
