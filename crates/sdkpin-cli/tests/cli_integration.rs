//! CLI subprocess integration tests.
//!
//! These tests invoke the `sdkpin` binary against temporary workspaces and
//! verify exit codes, stdout content, and JSON output shape.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const UTILS: &str = "packages/utils/package.json";

fn sdkpin(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sdkpin"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env_remove("SDKPIN_LOG")
        .output()
        .unwrap()
}

fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout)
        .unwrap_or_else(|e| panic!("invalid JSON ({e}): {}", stdout(output)))
}

/// Workspace with an app on the SDK, a `utils` member declaring `date-fns`
/// as `utils_version`, and the SDK's bundled list hoisted to the root.
fn workspace(utils_version: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "package.json",
        r#"{
  "name": "monorepo",
  "workspaces": ["apps/*", "packages/*"],
  "catalog": {"date-fns": "3.0.0"}
}
"#,
    );
    write(
        dir.path(),
        "apps/mobile/package.json",
        r#"{"name": "mobile", "dependencies": {"expo": "~52.0.0", "date-fns": "3.0.0"}}"#,
    );
    write(
        dir.path(),
        UTILS,
        &format!(r#"{{"name": "utils", "dependencies": {{"date-fns": "{utils_version}"}}}}"#),
    );
    write(
        dir.path(),
        "node_modules/expo/bundledNativeModules.json",
        r#"{"date-fns": "*", "expo-image": "*"}"#,
    );
    dir
}

#[test]
fn cli_version_exits_zero() {
    let output = Command::new(env!("CARGO_BIN_EXE_sdkpin"))
        .arg("--version")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("sdkpin"));
}

#[test]
fn cli_help_lists_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_sdkpin"))
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let out = stdout(&output);
    for cmd in ["check", "promote", "prune", "fix", "restore", "sync", "missing", "managed"] {
        assert!(out.contains(cmd), "help must list '{cmd}': {out}");
    }
}

#[test]
fn clean_workspace_check_exits_zero() {
    let ws = workspace("catalog:");
    let output = sdkpin(ws.path(), &["check"]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout(&output));
}

#[test]
fn violation_check_exits_one() {
    let ws = workspace("3.0.0");
    let output = sdkpin(ws.path(), &["check"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains(UTILS));
}

#[test]
fn check_json_reports_rule_and_summary() {
    let ws = workspace("3.0.0");
    let output = sdkpin(ws.path(), &["check", "--json"]);
    assert_eq!(output.status.code(), Some(1));
    let value = json(&output);
    assert_eq!(value["app"]["manifest_rel_path"], "apps/mobile/package.json");
    assert!(value["report"]["summary"]["errors"].as_u64().unwrap() >= 1);
    let diags = value["report"]["diagnostics"].as_array().unwrap();
    assert!(diags
        .iter()
        .any(|d| d["rule"] == "must-use-catalog" && d["manifest"] == UTILS));
}

#[test]
fn promote_rewrites_member() {
    let ws = workspace("3.0.0");
    let output = sdkpin(ws.path(), &["promote"]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout(&output));
    let utils = fs::read_to_string(ws.path().join(UTILS)).unwrap();
    assert!(utils.contains(r#""date-fns": "catalog:""#), "{utils}");

    let recheck = sdkpin(ws.path(), &["check"]);
    assert_eq!(recheck.status.code(), Some(0));
}

#[test]
fn dry_run_leaves_files_untouched() {
    let ws = workspace("3.0.0");
    let before = fs::read_to_string(ws.path().join(UTILS)).unwrap();
    let output = sdkpin(ws.path(), &["fix", "--dry-run", "--json"]);
    assert_eq!(output.status.code(), Some(0));
    let value = json(&output);
    assert_eq!(value["write"]["dry_run"], true);
    assert!(value["write"]["written"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p == UTILS));
    assert_eq!(fs::read_to_string(ws.path().join(UTILS)).unwrap(), before);
}

#[test]
fn prune_removes_unreferenced_entry() {
    let ws = workspace("3.0.0");
    // Nothing references the catalog entry yet.
    let output = sdkpin(ws.path(), &["prune", "--json"]);
    assert_eq!(output.status.code(), Some(0));
    let value = json(&output);
    assert_eq!(value["changes"][0]["package"], "date-fns");
    let root = fs::read_to_string(ws.path().join("package.json")).unwrap();
    assert!(!root.contains("date-fns"), "{root}");
}

#[test]
fn missing_root_manifest_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let output = sdkpin(dir.path(), &["check"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot load root manifest"), "{stderr}");
}

#[test]
fn invalid_config_exits_two() {
    let ws = workspace("catalog:");
    write(ws.path(), "sdkpin.toml", "sdk_package = \"\"\n");
    let output = sdkpin(ws.path(), &["check"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn workspace_without_app_exits_one() {
    let ws = workspace("catalog:");
    fs::remove_file(ws.path().join("apps/mobile/package.json")).unwrap();
    let output = sdkpin(ws.path(), &["check"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn managed_reports_verdict_and_basis() {
    let ws = workspace("catalog:");
    let output = sdkpin(ws.path(), &["managed", "date-fns", "left-pad", "--json"]);
    assert_eq!(output.status.code(), Some(0));
    let value = json(&output);
    assert_eq!(value["date-fns"]["managed"], true);
    assert_eq!(value["date-fns"]["basis"], "authority");
    assert_eq!(value["left-pad"]["managed"], false);
}

#[test]
fn missing_lists_uncatalogued_packages() {
    let ws = workspace("catalog:");
    write(
        ws.path(),
        "packages/media/package.json",
        r#"{"name": "media", "dependencies": {"expo-image": "~2.0.0"}}"#,
    );
    let output = sdkpin(ws.path(), &["missing", "--json"]);
    assert_eq!(output.status.code(), Some(0));
    let value = json(&output);
    assert_eq!(value["missing"][0]["package"], "expo-image");
    assert!(value["install_command"]
        .as_str()
        .unwrap()
        .ends_with("expo-image"));
}

#[test]
fn sync_copies_app_versions() {
    let ws = workspace("catalog:");
    write(
        ws.path(),
        "apps/mobile/package.json",
        r#"{"name": "mobile", "dependencies": {"expo": "~52.0.0", "date-fns": "3.6.0"}}"#,
    );
    let output = sdkpin(ws.path(), &["sync"]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout(&output));
    let root = fs::read_to_string(ws.path().join("package.json")).unwrap();
    assert!(root.contains(r#""date-fns": "3.6.0""#), "{root}");
}

#[test]
fn doctor_json_is_parseable() {
    let ws = workspace("catalog:");
    let output = sdkpin(ws.path(), &["doctor", "--json"]);
    let value = json(&output);
    assert!(value["healthy"].is_boolean());
    let checks = value["checks"].as_array().unwrap();
    assert!(checks
        .iter()
        .any(|c| c["name"] == "authority" && c["status"] == "pass"));
}

#[test]
fn completions_bash() {
    let output = Command::new(env!("CARGO_BIN_EXE_sdkpin"))
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("sdkpin"));
}
