//! CLI integration tests for toot-post
//!
//! None of these reach the network: each one fails before a remote call or
//! only inspects argument handling.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn toot_post(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("toot-post").unwrap();
    cmd.arg("--config-dir")
        .arg(config_dir.path())
        .env_remove("TOOTCAST_CONFIG_DIR")
        .env_remove("TOOTCAST_LOG_FORMAT");
    cmd
}

#[test]
fn test_help_flag_output() {
    let mut cmd = Command::cargo_bin("toot-post").unwrap();

    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Post a status to a Mastodon instance"))
        .stdout(predicate::str::contains("--visibility"))
        .stdout(predicate::str::contains("--reply-to"))
        .stdout(predicate::str::contains("--spoiler"))
        .stdout(predicate::str::contains("--format"));
}

#[test]
fn test_version_flag_output() {
    let mut cmd = Command::cargo_bin("toot-post").unwrap();

    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("toot-post"));
}

#[test]
fn test_empty_stdin_exits_with_invalid_input() {
    let dir = TempDir::new().unwrap();

    toot_post(&dir)
        .write_stdin("   \n")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("cannot be empty"));
}

#[test]
fn test_empty_argument_exits_with_invalid_input() {
    let dir = TempDir::new().unwrap();

    toot_post(&dir).arg("").assert().code(3);
}

#[test]
fn test_invalid_visibility_exits_with_invalid_input() {
    let dir = TempDir::new().unwrap();

    toot_post(&dir)
        .args(["--visibility", "everyone", "hello"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid visibility"));
}

#[test]
fn test_missing_config_exits_with_error() {
    let dir = TempDir::new().unwrap();

    toot_post(&dir)
        .arg("hello")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_invalid_config_is_reported_without_posting() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "[instance]\nbase_url = \"https://example.social/\"\nclient_key = \"key1\"\n",
    )
    .unwrap();

    toot_post(&dir)
        .arg("hello")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid config file"));
}

#[test]
fn test_registered_without_login_requires_setup() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "[instance]\nbase_url = \"https://example.social/\"\nclient_key = \"key1\"\nclient_secret = \"secret1\"\n",
    )
    .unwrap();

    toot_post(&dir)
        .arg("hello")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("toot-setup"));
}

#[test]
fn test_invalid_format_rejected() {
    let dir = TempDir::new().unwrap();

    toot_post(&dir)
        .args(["--format", "xml", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
