//! Command-line tests against small configurations.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SMALL: &str = r#"
[portfolio]
counterparty = "Test CP"

[[portfolio.swaps]]
id = "USD-2Y"
currency = "USD"
notional = 1000000.0
fixed_rate = 0.037
maturity = 2.0

[[portfolio.swaps]]
id = "EUR-2Y"
currency = "EUR"
notional = 1000000.0
fixed_rate = 0.024
maturity = 2.0
direction = "receiver"

[simulation]
horizon = 2.0
steps = 4
paths = 64

[surrogate]
training_points = 8
optimize = false
"#;

fn gpxva() -> Command {
    let mut cmd = Command::cargo_bin("gpxva").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("GPXVA_CONFIG");
    cmd
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_config_show_prints_demo() {
    gpxva()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[market]"))
        .stdout(predicate::str::contains("domestic = \"USD\""))
        .stdout(predicate::str::contains("JPY-8Y"));
}

#[test]
fn test_config_init_then_validate() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.toml");
    let path_str = path.to_str().unwrap();

    gpxva()
        .args(["config", "init", "--output", path_str])
        .assert()
        .success();
    assert!(path.exists());

    gpxva()
        .args(["config", "init", "--output", path_str])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    gpxva()
        .args(["config", "validate", path_str])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn test_config_validate_lists_problems() {
    let dir = TempDir::new().unwrap();
    let bad = SMALL.replace("paths = 64", "paths = 0");
    let path = write(dir.path(), "bad.toml", &bad);

    gpxva()
        .args(["config", "validate", path.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("simulation.paths"));
}

#[test]
fn test_price_lists_swaps() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "small.toml", SMALL);

    gpxva()
        .args(["price", "--config", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("USD-2Y"))
        .stdout(predicate::str::contains("EUR-2Y"))
        .stdout(predicate::str::contains("Net MtM"));

    gpxva()
        .args(["price", "--format", "minimal", "--config", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^-?\d+\.\d{2}\n$").unwrap());
}

#[test]
fn test_simulate_then_run_on_saved_paths() {
    let dir = TempDir::new().unwrap();
    let config = write(dir.path(), "small.toml", SMALL);
    let paths = dir.path().join("paths.csv");

    gpxva()
        .args(["-q", "simulate", "--config"])
        .arg(&config)
        .arg("--output")
        .arg(&paths)
        .assert()
        .success();
    let csv = std::fs::read_to_string(&paths).unwrap();
    assert!(csv.starts_with("path,step,time,r_USD,r_EUR"));
    // 64 paths x 5 dates plus the header
    assert_eq!(csv.lines().count(), 64 * 5 + 1);

    gpxva()
        .args(["-q", "--format", "minimal", "run", "--config"])
        .arg(&config)
        .arg("--scenarios")
        .arg(&paths)
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^\d+\.\d{6} \d+\.\d{6}\n$").unwrap());
}

#[test]
fn test_run_writes_json_report() {
    let dir = TempDir::new().unwrap();
    let config = write(dir.path(), "small.toml", SMALL);
    let report = dir.path().join("report.json");

    let output = gpxva()
        .args(["-q", "--format", "json", "run", "--sequential", "--config"])
        .arg(&config)
        .arg("--output")
        .arg(&report)
        .output()
        .unwrap();
    assert!(output.status.success());

    let printed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(printed["n_instruments"], 2);
    assert_eq!(printed["n_steps"], 5);
    assert_eq!(printed["counterparty"], "Test CP");
    assert_eq!(saved["analytical"]["cva"], printed["analytical"]["cva"]);
}

#[test]
fn test_run_table_output() {
    let dir = TempDir::new().unwrap();
    let config = write(dir.path(), "small.toml", SMALL);

    gpxva()
        .args(["-q", "run", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("CVA analytical"))
        .stdout(predicate::str::contains("CVA surrogate"))
        .stdout(predicate::str::contains("EPE surrogate"));
}

#[test]
fn test_missing_config_file() {
    gpxva()
        .args(["price", "--config", "/nonexistent/gpxva.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}
