//! Integration tests for the `tcc` CLI binary.
//!
//! Argument parsing, config handling and error exit codes, plus end-to-end
//! runs against a wiremock portal.
#![allow(clippy::unwrap_used)]

use std::io::Write;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

const DEVICE: u64 = 1234;

/// Build a [`Command`] for the `tcc` binary with env isolation.
///
/// Clears the `TCC_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn tcc_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("tcc");
    cmd.env("HOME", "/tmp/tcc-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/tcc-cli-test-nonexistent")
        .env_remove("TCC_PROFILE")
        .env_remove("TCC_CONFIG")
        .env_remove("TCC_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn write_config(dir: &Path, base_url: &str) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"
default_profile = "home"

[profiles.home]
username = "user@example.com"
password = "hunter2"
base_url = "{base_url}"
timeout_secs = 5

[profiles.home.fetch_retry]
max_retries = 1
base_delay_ms = 1
"#
    )
    .unwrap();
    path
}

async fn mount_portal(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/portal"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Set-Cookie", ".ASPXAUTH_TRUEHOME=abc123; path=/; HttpOnly"),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/portal"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/portal/Location/GetLocationListData/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "LocationID": 1,
            "Name": "Home",
            "Devices": [{ "DeviceID": DEVICE, "Name": "Hallway" }]
        }])))
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/portal/Location/GetLocationListData/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/portal/Device/CheckDataSession/{DEVICE}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "deviceLive": true,
            "communicationLost": false,
            "latestData": {
                "uiData": {
                    "DispTemperature": 70.5,
                    "HeatSetpoint": 68.0,
                    "CoolSetpoint": 76.0,
                    "DisplayUnits": "F",
                    "SystemSwitchPosition": 1,
                    "StatusHeat": 0,
                    "StatusCool": 0,
                    "EquipmentOutputStatus": 1,
                    "SwitchHeatAllowed": true,
                    "SwitchCoolAllowed": true
                },
                "hasFan": false
            }
        })))
        .mount(server)
        .await;
}

async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = tcc_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    tcc_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Total Connect Comfort")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("away")),
    );
}

#[test]
fn test_version_flag() {
    tcc_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tcc"));
}

#[test]
fn test_unknown_mode_is_rejected() {
    tcc_cmd()
        .args(["set", "1", "--mode", "turbo"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown mode"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_masks_password() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "https://portal.invalid");

    tcc_cmd()
        .arg("--config")
        .arg(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("********")
                .and(predicate::str::contains("user@example.com"))
                .and(predicate::str::contains("hunter2").not()),
        );
}

#[test]
fn test_config_path_honors_flag() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("elsewhere.toml");

    tcc_cmd()
        .arg("--config")
        .arg(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("elsewhere.toml"));
}

#[test]
fn test_status_without_profiles_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = tcc_cmd()
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .arg("status")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("No profiles configured"));
}

// ── Against a mock portal ───────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_status_json() {
    let server = MockServer::start().await;
    mount_portal(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri());

    let mut cmd = tcc_cmd();
    cmd.arg("--config").arg(&config).args(["status", "-o", "json"]);
    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let views: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(views[0]["state"]["device_id"], DEVICE);
    assert_eq!(views[0]["state"]["current_temperature"], 70.5);
    assert_eq!(views[0]["state"]["equipment"], "heating");
    assert_eq!(views[0]["available"], true);
    assert_eq!(views[0]["phase"], "updated");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_locations_table() {
    let server = MockServer::start().await;
    mount_portal(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri());

    let mut cmd = tcc_cmd();
    cmd.arg("--config").arg(&config).arg("locations");
    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Hallway"), "{stdout}");
    assert!(stdout.contains("1234"), "{stdout}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_device_exits_not_found() {
    let server = MockServer::start().await;
    mount_portal(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri());

    let mut cmd = tcc_cmd();
    cmd.arg("--config").arg(&config).args(["status", "999"]);
    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("tcc locations"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_login_exits_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/portal"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri());

    let mut cmd = tcc_cmd();
    cmd.arg("--config").arg(&config).arg("status");
    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("Authentication failed"));
}
