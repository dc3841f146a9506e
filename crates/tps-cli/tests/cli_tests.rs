//! CLI integration tests for tps-cli
//!
//! Tests command parsing, output formatting, and config handling.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

const SERIAL: [&str; 24] = [
    "b1", "l1A", "r1A", "o1A+3", "w1A", "u1A", "l1B", "r1B", "o1B*2", "w1B", "u1B", "c1", "b2",
    "l2A", "r2A", "o2A*2", "w2A", "u2A", "l2B", "r2B", "o2B+1", "w2B", "u2B", "c2",
];

/// Helper to run the CLI with arguments against an isolated config file
fn run_tps(config: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_tps"))
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn config_file() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    (dir, path)
}

// ==================== Help & Version Tests ====================

#[test]
fn test_cli_help() {
    let (_dir, config) = config_file();
    let output = run_tps(&config, &["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("generate"));
    assert!(stdout.contains("classify"));
    assert!(stdout.contains("train"));
    assert!(stdout.contains("config"));
}

#[test]
fn test_cli_version() {
    let (_dir, config) = config_file();
    let output = run_tps(&config, &["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("tps"));
}

#[test]
fn test_train_help_mentions_lock_rules() {
    let (_dir, config) = config_file();
    let output = run_tps(&config, &["train", "--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"lr\""));
    assert!(stdout.contains("\"wu\""));
}

// ==================== Classify Tests ====================

#[test]
fn test_classify_serial_schedule() {
    let (_dir, config) = config_file();
    let mut args = vec!["classify"];
    args.extend(SERIAL);
    args.extend(["--a", "4", "--b", "5"]);

    let output = run_tps(&config, &args);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("class: conflict_serializable"));
}

#[test]
fn test_classify_json() {
    let (_dir, config) = config_file();
    let mut args = vec!["--json", "classify", "--a", "4", "--b", "5", "--trace"];
    args.extend(SERIAL);

    let output = run_tps(&config, &args);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["class"], "conflict_serializable");
    assert_eq!(json["verdict"]["legal"], true);
    assert_eq!(json["trace"].as_array().unwrap().len(), 24);
    // T1 ran first: A = (4 + 3) * 2
    assert_eq!(json["trace"][23]["a"], 14);
}

#[test]
fn test_classify_rejects_incomplete_schedule() {
    let (_dir, config) = config_file();
    let output = run_tps(&config, &["classify", "b1", "b2", "--a", "1", "--b", "1"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_classify_rejects_bad_token_json() {
    let (_dir, config) = config_file();
    let output = run_tps(&config, &["--json", "classify", "x1A", "--a", "1", "--b", "1"]);
    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["success"], false);
}

// ==================== Generate Tests ====================

#[test]
fn test_generate_is_reproducible_with_seed() {
    let (_dir, config) = config_file();
    let args = ["--json", "--seed", "7", "generate", "--rounds", "2"];

    let first = run_tps(&config, &args);
    let second = run_tps(&config, &args);
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);

    let json: serde_json::Value = serde_json::from_slice(&first.stdout).unwrap();
    let sections = json["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0]["schedule"].as_array().unwrap().len(), 24);
}

#[test]
fn test_generate_text_shows_table_and_solution() {
    let (_dir, config) = config_file();
    let output = run_tps(&config, &["--seed", "1", "generate", "--rounds", "1"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Section 1: A = "));
    assert!(stdout.contains("BOT"));
    assert!(stdout.contains("Solution:"));
}

#[test]
fn test_generate_uses_exercise_list() {
    let (_dir, config) = config_file();
    let steps = SERIAL.join(" ");
    std::fs::write(
        &config,
        format!(
            "[[exercises]]\nsteps = \"{steps}\"\na = 4\nb = 5\n\n[[exercises]]\na = 2\n"
        ),
    )
    .unwrap();

    let output = run_tps(&config, &["--json", "--seed", "2", "generate"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let sections = json["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0]["schedule"][3], "o1A+3");
    assert_eq!(sections[0]["a"], 4);
    assert_eq!(sections[0]["target"], "conflict_serializable");
    assert_eq!(sections[1]["a"], 2);
}

// ==================== Train Tests ====================

#[test]
fn test_train_reads_answers_from_stdin() {
    let (_dir, config) = config_file();
    let mut child = Command::new(env!("CARGO_BIN_EXE_tps"))
        .arg("--config")
        .arg(&config)
        .args(["--seed", "3", "train", "--rounds", "1"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("Failed to spawn command");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"y\nn\nn\nn\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Is the schedule consistent?"));
    assert!(stdout.contains("Score: "));
    assert!(stdout.contains("/1 rounds correct"));
}

// ==================== Config Tests ====================

#[test]
fn test_config_set_and_show() {
    let (_dir, config) = config_file();

    let output = run_tps(&config, &["config", "--set-rounds", "0", "--set-feedback", "false"]);
    assert!(output.status.success());
    assert!(config.exists());

    let output = run_tps(&config, &["--json", "config", "--show"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["rounds"], 0);
    assert_eq!(json["feedback"], false);
    assert_eq!(json["config"]["value_range"][1], 9);
}

#[test]
fn test_invalid_config_file_is_reported() {
    let (_dir, config) = config_file();
    std::fs::write(&config, "rounds = \"many\"").unwrap();

    let output = run_tps(&config, &["generate"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Config error"));
}
