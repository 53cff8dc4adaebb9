//! Integration tests for argument parsing, aliases and exit codes.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// The binary with its config redirected into `home`.
pub fn droplet(home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("droplet"));
    cmd.env("NO_COLOR", "1")
        .env("DROPLET_CONFIG", home.path().join("config.yaml"))
        .env_remove("DROPLET_PASSWORD")
        .env_remove("DROPLET_S3_SECRET_KEY");
    cmd
}

/// Write a config targeting `example.com` with a DAV store that nothing
/// listens on.
pub fn targeted(home: &TempDir) {
    std::fs::write(
        home.path().join("config.yaml"),
        "target: example.com\n\
         blob_store:\n  type: dav\n  host: 127.0.0.1\n  port: 1\n",
    )
    .expect("write config");
}

// --- Help and version ---

#[test]
fn test_cli_no_args_shows_help_and_exits_two() {
    let home = TempDir::new().expect("tempdir");
    droplet(&home)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Build, launch and move application droplets"));
}

#[test]
fn test_cli_help_lists_commands() {
    let home = TempDir::new().expect("tempdir");
    droplet(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build-droplet"))
        .stdout(predicate::str::contains("launch-droplet"))
        .stdout(predicate::str::contains("export-droplet"));
}

#[test]
fn test_cli_version_flag_shows_version() {
    let home = TempDir::new().expect("tempdir");
    droplet(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("droplet"));
}

#[test]
fn test_unknown_command_is_usage_error() {
    let home = TempDir::new().expect("tempdir");
    droplet(&home).arg("frobnicate").assert().code(2);
}

#[test]
fn test_missing_positional_is_usage_error() {
    let home = TempDir::new().expect("tempdir");
    droplet(&home)
        .args(["remove-droplet"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("DROPLET_NAME"));
}

#[test]
fn test_s3_flags_require_s3() {
    let home = TempDir::new().expect("tempdir");
    droplet(&home)
        .args(["target", "example.com", "--bucket", "b"])
        .assert()
        .code(2);
}

// --- Store and input failures ---

#[test]
fn test_list_without_store_fails() {
    let home = TempDir::new().expect("tempdir");
    droplet(&home)
        .arg("list-droplets")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "No droplet store specified. Run 'droplet target' first.",
        ));
}

#[test]
fn test_aliases_reach_the_same_command() {
    let home = TempDir::new().expect("tempdir");
    droplet(&home)
        .arg("lsd")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No droplet store specified"));
}

#[test]
fn test_unreachable_store_fails_verification() {
    let home = TempDir::new().expect("tempdir");
    targeted(&home);
    droplet(&home)
        .arg("list-droplets")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("verifying droplet store"));
}

#[test]
fn test_launch_without_target_exits_four() {
    let home = TempDir::new().expect("tempdir");
    droplet(&home)
        .args(["launch-droplet", "web", "app"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Target not set"));
}

#[test]
fn test_launch_rejects_cpu_weight_out_of_range() {
    let home = TempDir::new().expect("tempdir");
    targeted(&home);
    droplet(&home)
        .args(["launch-droplet", "web", "app", "-c", "0"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("invalid CPU weight 0"));
}

#[test]
fn test_launch_rejects_route_to_unexposed_port() {
    let home = TempDir::new().expect("tempdir");
    targeted(&home);
    droplet(&home)
        .args(["launch-droplet", "web", "app", "-p", "8080", "-R", "admin:9090"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("admin:9090"));
}

#[test]
fn test_build_unknown_buildpack_lists_catalog() {
    let home = TempDir::new().expect("tempdir");
    targeted(&home);
    droplet(&home)
        .args(["build-droplet", "app", "cobol"])
        .assert()
        .code(4)
        .stdout(predicate::str::contains("Available buildpacks:"))
        .stdout(predicate::str::contains("go"))
        .stderr(predicate::str::contains("invalid buildpack cobol"));
}

#[test]
fn test_build_rejects_bad_timeout() {
    let home = TempDir::new().expect("tempdir");
    droplet(&home)
        .args(["build-droplet", "app", "go", "-t", "soon"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid duration"));
}
