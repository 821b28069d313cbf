//! CLI smoke tests
//!
//! Every run is isolated in a temp directory: config, data and working
//! directories all point inside it, so no model or Telegraph call is made.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use novelstore::{PublishRecord, ProjectRecord, Store};
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn nw(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("nw").expect("binary builds");
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env("XDG_DATA_HOME", dir.join("data"))
        .env("NOVEL_DB_PATH", dir.join("novels.db"))
        .env("NOVEL_OUTPUTS_DIR", dir.join("outputs"))
        .env_remove("NOVEL_PROJECT")
        .env_remove("TELEGRAPH_ACCESS_TOKEN");
    cmd
}

fn seed(dir: &Path) {
    let store = Store::open(dir.join("novels.db")).unwrap();
    store
        .put_project(&ProjectRecord {
            project_id: "signal-1".to_string(),
            title: "Signal".to_string(),
            blurb: "A pager that answers back.".to_string(),
            created_at_utc: "2025-01-02T03:04:05+00:00".to_string(),
            plan: json!({"topic": {"title": "Signal"}, "outline": []}),
        })
        .unwrap();
    store
        .put_publish(&PublishRecord {
            project_id: "signal-1".to_string(),
            chapter_idx: 0,
            path: "Signal-01-02".to_string(),
            url: "https://telegra.ph/Signal-01-02".to_string(),
            published_at_utc: "2025-01-02T04:00:00+00:00".to_string(),
        })
        .unwrap();
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    nw(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("write-chapter"))
        .stdout(predicate::str::contains("telegraph-init"))
        .stdout(predicate::str::contains("Logs are written to"));
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    nw(dir.path()).arg("--version").assert().success().stdout(predicate::str::starts_with("nw "));
}

#[test]
fn test_chapter_out_of_range_is_rejected() {
    let dir = TempDir::new().unwrap();
    nw(dir.path())
        .args(["write-chapter", "--project", "signal-1", "--chapter", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("chapter must be in 1..=8"));
}

#[test]
fn test_list_projects() {
    let dir = TempDir::new().unwrap();
    seed(dir.path());

    nw(dir.path())
        .arg("list-projects")
        .assert()
        .success()
        .stdout("signal-1\t2025-01-02T03:04:05+00:00\tSignal\n");
}

#[test]
fn test_status_lines() {
    let dir = TempDir::new().unwrap();
    seed(dir.path());

    let output = nw(dir.path())
        .args(["status", "--project", "signal-1"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines.len(), 10);
    assert_eq!(lines[0], "project\tsignal-1\tSignal");
    assert_eq!(lines[1], "ch1\tN\t-\t-");
    assert_eq!(lines[8], "ch8\tN\t-\t-");
    assert_eq!(lines[9], "index\thttps://telegra.ph/Signal-01-02");
}

#[test]
fn test_project_from_environment() {
    let dir = TempDir::new().unwrap();
    seed(dir.path());

    nw(dir.path())
        .arg("show-plan")
        .env("NOVEL_PROJECT", "signal-1")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"title\": \"Signal\""));
}

#[test]
fn test_show_plan_summary() {
    let dir = TempDir::new().unwrap();
    seed(dir.path());

    nw(dir.path())
        .args(["show-plan", "--project", "signal-1", "--summary"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("project_id\tsignal-1\ntitle\tSignal\n"))
        .stdout(predicate::str::contains("\noutline\n"))
        .stdout(predicate::str::contains("\"topic\"").not());
}

#[test]
fn test_status_unknown_project_fails() {
    let dir = TempDir::new().unwrap();
    nw(dir.path())
        .args(["status", "--project", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Project not found: nope"));
}

#[test]
fn test_publish_without_token_fails() {
    let dir = TempDir::new().unwrap();
    seed(dir.path());

    nw(dir.path())
        .args(["publish-index", "--project", "signal-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TELEGRAPH_ACCESS_TOKEN"));
}

#[test]
fn test_telegraph_init_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    let env_file = dir.path().join("secrets.env");
    fs::write(&env_file, "TELEGRAPH_ACCESS_TOKEN=existing\n").unwrap();

    nw(dir.path())
        .args(["telegraph-init", "--short-name", "nw", "--env-file"])
        .arg(&env_file)
        .write_stdin("")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Re-run with --force"))
        .stdout(predicate::str::contains("existing").not());

    assert_eq!(fs::read_to_string(&env_file).unwrap(), "TELEGRAPH_ACCESS_TOKEN=existing\n");
}
