//! Integration tests for the `atelier` binary.
//!
//! Only commands that need no network are exercised; `generate` is checked
//! for its failure path without credentials.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_atelier(temp_dir: &TempDir, workspace: &Path, args: &[&str]) -> Output {
    let home = temp_dir.path().join("home");
    let config_home = temp_dir.path().join("config");
    let data_home = temp_dir.path().join("data");
    fs::create_dir_all(&home).unwrap();
    fs::create_dir_all(&config_home).unwrap();
    fs::create_dir_all(&data_home).unwrap();

    Command::new(env!("CARGO_BIN_EXE_atelier"))
        .env("HOME", home.as_os_str())
        .env("XDG_CONFIG_HOME", config_home.as_os_str())
        .env("XDG_DATA_HOME", data_home.as_os_str())
        .env_remove("GEMINI_API_KEY")
        .env_remove("GOOGLE_API_KEY")
        .env_remove("ATELIER_LOG")
        .env("ATELIER_LOG_OUTPUT", "stderr")
        .arg("--workspace")
        .arg(workspace)
        .args(args)
        .output()
        .unwrap()
}

fn workspace_with_history(temp_dir: &TempDir) -> std::path::PathBuf {
    let workspace = temp_dir.path().join("ws");
    fs::create_dir_all(workspace.join("config")).unwrap();
    fs::write(
        workspace.join("config").join("config.toml"),
        "[history]\nstore_path = \".atelier/history\"\n",
    )
    .unwrap();
    workspace
}

#[test]
fn test_styles_lists_all_styles() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace_with_history(&temp_dir);

    let output = run_atelier(&temp_dir, &workspace, &["styles"]);
    assert!(
        output.status.success(),
        "atelier styles should succeed: stderr={:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("watercolor"));
    assert!(stdout.contains("digital_art"));
}

#[test]
fn test_history_list_on_fresh_workspace() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace_with_history(&temp_dir);

    let output = run_atelier(&temp_dir, &workspace, &["history", "list"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("The gallery is empty."));
    assert!(workspace.join(".atelier").join("history").exists());

    let output = run_atelier(&temp_dir, &workspace, &["history", "list", "--format", "json"]);
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value, serde_json::json!([]));
}

#[test]
fn test_history_show_missing_entry_fails() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace_with_history(&temp_dir);

    let output = run_atelier(&temp_dir, &workspace, &["history", "show", "3"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No history entry at position 3"));
}

#[test]
fn test_history_list_rejects_unknown_format() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace_with_history(&temp_dir);

    let output = run_atelier(&temp_dir, &workspace, &["history", "list", "--format", "yaml"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("yaml"));
}

#[test]
fn test_history_replay_missing_entry_fails() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace_with_history(&temp_dir);

    let output = run_atelier(&temp_dir, &workspace, &["history", "replay", "0"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No history entry at position 0"));
}

#[test]
fn test_generate_without_credentials_reports_configuration() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = workspace_with_history(&temp_dir);

    let output = run_atelier(&temp_dir, &workspace, &["generate", "a lighthouse"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not configured"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = temp_dir.path().join("ws");
    fs::create_dir_all(workspace.join("config")).unwrap();
    fs::write(
        workspace.join("config").join("config.toml"),
        "[history]\nstore_path = \".atelier/history\"\ncapacity = 0\n",
    )
    .unwrap();

    let output = run_atelier(&temp_dir, &workspace, &["styles"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("capacity must be greater than 0"));
}
