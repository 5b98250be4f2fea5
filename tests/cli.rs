mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

use cft_updater::{ArtifactType, Platform};
use common::MockCdn;

fn cft_updater() -> Command {
    let mut cmd = Command::cargo_bin("cft-updater").unwrap();
    cmd.env_remove("CFT_UPDATER_TIMEOUT")
        .env_remove("CFT_UPDATER_VERSION_URL")
        .env_remove("CFT_UPDATER_DOWNLOAD_BASE")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &Path, cdn: &MockCdn) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(
        &path,
        format!(
            "version_url = \"{}/LATEST_RELEASE_STABLE\"\ndownload_base = \"{}\"\nmax_retries = 0\n",
            cdn.base_url(),
            cdn.base_url()
        ),
    )
    .unwrap();
    path
}

#[test]
fn help_lists_subcommands() {
    cft_updater()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("check")
                .and(predicate::str::contains("install"))
                .and(predicate::str::contains("status")),
        );
}

#[test]
fn status_of_empty_root() {
    let root = tempfile::tempdir().unwrap();
    cft_updater()
        .args(["status", "--platform", "linux64", "--root"])
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Not installed"));
    assert!(root.path().join("chrome").is_dir());
}

#[test]
fn root_named_chrome_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    cft_updater()
        .args(["status", "--platform", "linux64", "--root"])
        .arg(dir.path().join("chrome"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("parent directory"));
}

#[test]
fn missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    cft_updater()
        .args(["status", "--platform", "linux64", "--config"])
        .arg(dir.path().join("nope.toml"))
        .arg("--root")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn check_reports_available_update() {
    let cdn = MockCdn::start();
    cdn.set_latest("125.0.1.1\n");
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &cdn);

    cft_updater()
        .args(["check", "--platform", "linux64", "--config"])
        .arg(&config)
        .arg("--root")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Installed: none")
                .and(predicate::str::contains("Latest:    125.0.1.1"))
                .and(predicate::str::contains("Update available")),
        );
}

#[test]
fn install_then_status() {
    let cdn = MockCdn::start();
    cdn.set_latest("125.0.1.1\n");
    cdn.publish(
        "125.0.1.1",
        Platform::Linux64,
        ArtifactType::Chromedriver,
        &[("chromedriver", &b"driver"[..])],
    );
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &cdn);

    cft_updater()
        .args(["install", "--yes", "--platform", "linux64", "--artifact", "chromedriver", "--config"])
        .arg(&config)
        .arg("--root")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed 125.0.1.1"));

    assert!(
        dir.path()
            .join("chrome/chromedriver-linux64/chromedriver-linux64/chromedriver")
            .is_file()
    );

    cft_updater()
        .args(["status", "--platform", "linux64", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Version:   125.0.1.1")
                .and(predicate::str::contains("chromedriver")),
        );

    cft_updater()
        .args(["install", "--yes", "--platform", "linux64", "--artifact", "chromedriver", "--config"])
        .arg(&config)
        .arg("--root")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Already up to date: 125.0.1.1"));
}

#[test]
fn failed_install_exits_with_error() {
    let cdn = MockCdn::start();
    cdn.set_latest("125.0.1.1\n");
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &cdn);

    cft_updater()
        .args(["install", "--yes", "--platform", "linux64", "--config"])
        .arg(&config)
        .arg("--root")
        .arg(dir.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("404"));
}
