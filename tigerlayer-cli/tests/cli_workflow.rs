//! Integration tests for the CLI binary.
//!
//! Each test writes a config file into a temporary directory so output,
//! ledger and log files never touch the working tree. No test reaches the
//! network.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_tigerlayer"))
        .args(args)
        .output()
        .expect("failed to run tigerlayer")
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Config pointing every path into `root`.
fn write_config(root: &Path) -> PathBuf {
    let output = root.join("output");
    let config = format!(
        "[processing]\noutput_dir = {}\n\n[logging]\nfile = {}\n",
        output.display(),
        root.join("logs").join("tigerlayer.log").display()
    );
    let path = root.join("config.ini");
    fs::write(&path, config).unwrap();
    path
}

fn write_artifact(dir: &Path, name: &str, bbox: [f64; 4]) {
    fs::create_dir_all(dir).unwrap();
    let body = format!(
        r#"{{"type":"FeatureCollection","bbox":[{},{},{},{}],"features":[]}}"#,
        bbox[0], bbox[1], bbox[2], bbox[3]
    );
    fs::write(dir.join(name), body).unwrap();
}

#[test]
fn test_config_init_then_show() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("config.ini");
    let path_str = path.to_str().unwrap();

    let output = run_cli(&["config", "init", "--config", path_str]);
    assert!(output.status.success(), "{:?}", output);
    assert!(path.exists());

    // Second init without --force fails
    let output = run_cli(&["config", "init", "--config", path_str]);
    assert!(!output.status.success());

    let output = run_cli(&["config", "show", "--config", path_str]);
    assert!(output.status.success());
    let shown = stdout(&output);
    assert!(shown.contains("[servers]"));
    assert!(shown.contains("[layer.COUNTY]"));
}

#[test]
fn test_invalid_config_exits_with_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.ini");
    fs::write(&path, "[processing]\nmax_retries = lots\n").unwrap();

    let output = run_cli(&["config", "show", "--config", path.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_retries"));
}

#[test]
fn test_ledger_status_and_reset() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    let config = config.to_str().unwrap();

    let ledger = temp.path().join("output").join("processed_files.csv");
    fs::create_dir_all(ledger.parent().unwrap()).unwrap();
    fs::write(
        &ledger,
        "directory,filename,status,timestamp,protocol\n\
         COUNTY,a.zip,success,2024-01-01 00:00:00,ftp\n\
         COUNTY,b.zip,error:timeout,2024-01-01 00:00:01,https\n",
    )
    .unwrap();

    let output = run_cli(&["ledger", "status", "--config", config]);
    assert!(output.status.success(), "{:?}", output);
    let text = stdout(&output);
    assert!(text.contains("Attempts:        2"));
    assert!(text.contains("Processed files: 1"));

    let output = run_cli(&["ledger", "reset", "--config", config]);
    assert!(output.status.success());

    let content = fs::read_to_string(&ledger).unwrap();
    assert_eq!(content.lines().count(), 1);
}

#[test]
fn test_boundaries_and_manifest() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    let config = config.to_str().unwrap();
    let layer_dir = temp.path().join("output").join("ROADS");
    write_artifact(&layer_dir, "tl_2023_a_roads.s0000.geojson", [5.0, 5.0, 15.0, 15.0]);
    write_artifact(&layer_dir, "tl_2023_b_roads.s1111.geojson", [20.0, 20.0, 30.0, 30.0]);

    let output = run_cli(&["boundaries", "--layer", "ROADS", "--config", config]);
    assert!(output.status.success(), "{:?}", output);
    assert!(stdout(&output).contains("Wrote 2 tile boundaries"));
    assert!(layer_dir.join("tile_boundaries.geojson").exists());

    let output = run_cli(&["manifest", "--layer", "ROADS", "--config", config]);
    assert!(output.status.success());
    let manifest: Vec<String> =
        serde_json::from_slice(&fs::read(layer_dir.join("manifest.json")).unwrap()).unwrap();
    assert_eq!(
        manifest,
        vec!["tl_2023_a_roads.s0000.geojson", "tl_2023_b_roads.s1111.geojson"]
    );
}

#[test]
fn test_boundaries_for_missing_layer_fails() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let output = run_cli(&[
        "boundaries",
        "--layer",
        "NOPE",
        "--config",
        config.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(1));
}
