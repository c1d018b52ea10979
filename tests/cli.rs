use assert_cmd::Command;
use predicates::prelude::*;

const VALID: &str = "tests/fixtures/sample_valid.model.json";
const INVALID: &str = "tests/fixtures/sample_invalid.model.json";
const WARNING: &str = "tests/fixtures/sample_warning.model.json";
const DANGLING: &str = "tests/fixtures/sample_dangling.model.json";

fn trackgeff() -> Command {
    Command::cargo_bin("trackgeff").unwrap()
}

#[test]
fn runs() {
    trackgeff().assert().success();
}

#[test]
fn outputs_tool_name() {
    trackgeff()
        .arg("-V")
        .assert()
        .success()
        .stdout(concat!("trackgeff ", env!("CARGO_PKG_VERSION"), "\n"));
}

// Validate subcommand tests

#[test]
fn validate_valid_model_succeeds() {
    trackgeff()
        .args(["validate", VALID])
        .assert()
        .success()
        .stdout(predicate::str::contains("Validation passed"));
}

#[test]
fn validate_invalid_model_fails() {
    trackgeff()
        .args(["validate", INVALID])
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::contains("error(s)"))
        .stdout(predicate::str::contains("DuplicateDetectionId"))
        .stdout(predicate::str::contains("MissingLinkEndpoint"))
        .stdout(predicate::str::contains("InvalidRadius"));
}

#[test]
fn validate_warnings_fail_only_when_strict() {
    trackgeff()
        .args(["validate", WARNING])
        .assert()
        .success()
        .stdout(predicate::str::contains("EmptyUnits"));

    trackgeff()
        .args(["validate", WARNING, "--strict"])
        .assert()
        .failure();
}

#[test]
fn validate_json_output_format() {
    trackgeff()
        .args(["validate", VALID, "--output", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"error_count\": 0"))
        .stdout(predicate::str::contains("\"warning_count\": 0"));
}

#[test]
fn validate_nonexistent_file_fails() {
    trackgeff()
        .args(["validate", "nonexistent_file.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

// Export / import / inspect

#[test]
fn export_then_import_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("tracks.zarr");
    let model = dir.path().join("imported.json");

    trackgeff()
        .args(["export", VALID])
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("(2D)"))
        .stdout(predicate::str::contains("4 detections, 2 links, 1 tracks"));
    assert!(store.join("tracks.geff/.zattrs").is_file());

    trackgeff()
        .arg("import")
        .arg(&store)
        .arg(&model)
        .assert()
        .success()
        .stdout(predicate::str::contains("output: 4 detections, 2 links, 2 tracks"));

    let imported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&model).unwrap()).unwrap();
    assert_eq!(imported["detections"].as_array().unwrap().len(), 4);
    assert_eq!(imported["tracks"][0]["name"], "Track 200");
    assert_eq!(imported["tracks"][0]["features"]["TRACK_DURATION"], 2.0);
}

#[test]
fn import_restores_track_names_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("tracks.zarr");
    let model = dir.path().join("imported.json");

    trackgeff().args(["export", VALID]).arg(&store).assert().success();
    trackgeff()
        .arg("import")
        .arg(&store)
        .arg(&model)
        .args(["--restore-track-attributes", "--track-id-base", "50"])
        .assert()
        .success();

    let imported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&model).unwrap()).unwrap();
    assert_eq!(imported["tracks"][0]["id"], 50);
    assert_eq!(imported["tracks"][0]["name"], "Track 0");
}

#[test]
fn export_3d_flag_keeps_z_column() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("tracks.zarr");

    trackgeff()
        .args(["export", VALID, "--3d"])
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("(3D)"));
    assert!(store.join("tracks.geff/nodes/props/z/values/.zarray").is_file());
}

#[test]
fn export_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("tracks.zarr");

    trackgeff()
        .args(["export", VALID, "--report", "json", "--chunk-size", "2"])
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"direction\": \"export\""))
        .stdout(predicate::str::contains("\"skipped_links\": 0"));
}

#[test]
fn export_refuses_invalid_model() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("tracks.zarr");

    trackgeff()
        .args(["export", INVALID])
        .arg(&store)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("DuplicateDetectionId"));
    assert!(!store.join("tracks.geff/.zattrs").exists());
}

#[test]
fn export_skips_dangling_link() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("tracks.zarr");

    let output = trackgeff()
        .args(["export", DANGLING, "--report", "json"])
        .arg(&store)
        .assert()
        .success()
        .stderr(predicate::str::contains("MissingLinkEndpoint"))
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["skipped_links"], 1);
    assert_eq!(report["output"]["links"], 2);
    let skips: Vec<_> = report["issues"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|i| i["code"] == "unresolved_link_endpoint")
        .collect();
    assert_eq!(skips.len(), 1);
    assert!(skips[0]["message"]
        .as_str()
        .unwrap()
        .starts_with("1 link(s) skipped"));
}

#[test]
fn strict_validation_rejects_dangling_link() {
    trackgeff()
        .args(["validate", DANGLING, "--strict"])
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::contains("MissingLinkEndpoint"));
}

#[test]
fn export_refuses_empty_group() {
    let dir = tempfile::tempdir().unwrap();
    let keep = dir.path().join("keep.txt");
    std::fs::write(&keep, "data").unwrap();

    trackgeff()
        .args(["export", VALID])
        .arg(dir.path())
        .args(["--group", ""])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid group name"));
    assert!(keep.is_file());
}

#[test]
fn export_rejects_conflicting_dimension_flags() {
    trackgeff()
        .args(["export", VALID, "out.zarr", "--2d", "--3d"])
        .assert()
        .failure();
}

#[test]
fn inspect_summarizes_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("tracks.zarr");
    trackgeff().args(["export", VALID]).arg(&store).assert().success();

    trackgeff()
        .arg("inspect")
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("Dimensions:  2D"))
        .stdout(predicate::str::contains("Detections:  4"))
        .stdout(predicate::str::contains("Links:       2"))
        .stdout(predicate::str::contains("QUALITY"));

    trackgeff()
        .arg("inspect")
        .arg(&store)
        .args(["--output", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"geff_version\": \"0.4.0\""));
}

#[test]
fn inspect_missing_store_fails() {
    let dir = tempfile::tempdir().unwrap();
    trackgeff()
        .arg("inspect")
        .arg(dir.path().join("absent.zarr"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No GEFF metadata"));
}
