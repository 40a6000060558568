//! CLI binary tests via assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn hantone() -> Command {
    Command::cargo_bin("hantone").unwrap()
}

#[test]
fn help_lists_subcommands() {
    hantone()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("transcribe"))
        .stdout(predicate::str::contains("cache"));
}

#[test]
fn version_matches_crate() {
    hantone()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn config_show_prints_effective_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[quality]\nquality_threshold = 0.9\nmax_reprocess_attempts = 1\n")
        .unwrap();

    hantone()
        .args(["--config", path.to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[stt]"))
        .stdout(predicate::str::contains("quality_threshold = 0.9"));
}

#[test]
fn analyze_missing_file_fails_with_input_exit_code() {
    let dir = tempdir().unwrap();
    hantone()
        .args([
            "--config",
            // Nonexistent config falls back to defaults.
            dir.path().join("none.toml").to_str().unwrap(),
            "analyze",
            dir.path().join("missing.wav").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .code(4);
}

#[test]
fn cache_stats_reports_configuration() {
    let dir = tempdir().unwrap();
    hantone()
        .args([
            "--config",
            dir.path().join("none.toml").to_str().unwrap(),
            "cache",
            "stats",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("ttl:"))
        .stdout(predicate::str::contains("3600"));
}
