//! CLI integration tests for the Reclaim command-line interface.
//!
//! These tests verify:
//! - Help text is displayed correctly
//! - Argument parsing works as expected
//! - Sweeps over small simulated stores report the expected counts
//!
//! Every command runs with `RECLAIM_CONFIG_DIR` pointed at a temp dir so no
//! user config or log directory is touched.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the reclaim binary, isolated from user config.
fn reclaim(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("reclaim").unwrap();
    cmd.env("RECLAIM_CONFIG_DIR", config_dir.path())
        .current_dir(config_dir.path());
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let dir = TempDir::new().unwrap();
    reclaim(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reclaim"))
        .stdout(predicate::str::contains("sweep"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    reclaim(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("reclaim"));
}

#[test]
fn test_sweep_help_lists_options() {
    let dir = TempDir::new().unwrap();
    reclaim(&dir)
        .args(["sweep", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--sessions"))
        .stdout(predicate::str::contains("--expired"))
        .stdout(predicate::str::contains("--strategy"))
        .stdout(predicate::str::contains("--churn"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Sweep Command Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_sweep_purges_expired_sessions() {
    let dir = TempDir::new().unwrap();
    reclaim(&dir)
        .args(["sweep", "--sessions", "1000", "--expired", "400"])
        .assert()
        .success()
        .stdout(predicate::str::contains("purged 400"))
        .stdout(predicate::str::contains("Sessions remaining: 600"));
}

#[test]
fn test_sweep_json_output() {
    let dir = TempDir::new().unwrap();
    let output = reclaim(&dir)
        .args([
            "--json",
            "sweep",
            "--sessions",
            "500",
            "--expired",
            "123",
            "--strategy",
            "sequential",
            "--passes",
            "2",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let reports: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["pass"], 1);
    assert_eq!(reports[0]["purged"], 123);
    assert_eq!(reports[0]["outcome"], "completed");
    assert_eq!(reports[0]["sessions_after"], 377);
    assert_eq!(reports[1]["purged"], 0);
    assert!(reports[1]["cumulative_ms"].as_f64().unwrap() >= 0.0);
}

#[test]
fn test_sweep_with_churn_completes() {
    let dir = TempDir::new().unwrap();
    reclaim(&dir)
        .args([
            "sweep",
            "--sessions",
            "2000",
            "--expired",
            "1000",
            "--workers",
            "2",
            "--batch-size",
            "64",
            "--churn",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("purged 1000"));
}

#[test]
fn test_sweep_rejects_more_expired_than_sessions() {
    let dir = TempDir::new().unwrap();
    reclaim(&dir)
        .args(["sweep", "--sessions", "10", "--expired", "11"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot exceed"));
}

#[test]
fn test_sweep_rejects_unknown_strategy() {
    let dir = TempDir::new().unwrap();
    reclaim(&dir)
        .args(["sweep", "--strategy", "sideways"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown sweep strategy"));
}

#[test]
fn test_sweep_rejects_zero_batch_size() {
    let dir = TempDir::new().unwrap();
    reclaim(&dir)
        .args(["sweep", "--sessions", "10", "--expired", "1", "--batch-size", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sweep.batch_size"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Command Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_init_then_which() {
    let dir = TempDir::new().unwrap();
    reclaim(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));

    reclaim(&dir)
        .args(["config", "which"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 config file(s) applied"))
        .stdout(predicate::str::contains("Sweep strategy: parallel (from user config)"));
}

#[test]
fn test_config_which_reports_strategy_per_layer() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[sweep]\nstrategy = \"parallel\"\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("reclaim.toml"),
        "[sweep]\nstrategy = \"serial\"\n",
    )
    .unwrap();

    reclaim(&dir)
        .args(["config", "which"])
        .assert()
        .success()
        .stdout(predicate::str::contains("applied, strategy = parallel"))
        .stdout(predicate::str::contains("applied, strategy = sequential"))
        .stdout(predicate::str::contains("Sweep strategy: sequential (from project config)"));
}

#[test]
fn test_config_which_flags_rejected_layer() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("reclaim.toml"), "[sweep\n").unwrap();

    reclaim(&dir)
        .args(["config", "which"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rejected:"))
        .stdout(predicate::str::contains("Sweep strategy: parallel (default)"));
}

#[test]
fn test_config_path_local() {
    let dir = TempDir::new().unwrap();
    reclaim(&dir)
        .args(["config", "path", "--local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reclaim.toml"));

    reclaim(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_project_config_selects_strategy() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("reclaim.toml"),
        "[sweep]\nstrategy = \"sequential\"\nbatch_size = 32\n",
    )
    .unwrap();

    reclaim(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("strategy:   sequential"))
        .stdout(predicate::str::contains("batch_size: 32"));
}
