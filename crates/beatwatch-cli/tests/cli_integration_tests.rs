//! CLI integration tests
//!
//! Each test runs the built binary against a database in a temp dir.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use beatwatch_core::notify::{Notification, NotificationTopic};
use beatwatch_store::db;
use beatwatch_store::repo::OutboxRepo;
use tempfile::TempDir;

fn db_path(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("beatwatch.db")
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_beatwatch"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(["--log", "test"])
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_db_migrate_then_status() {
    let temp_dir = TempDir::new().unwrap();
    let db = db_path(&temp_dir);
    let db = db.to_str().unwrap();

    let first = run(temp_dir.path(), &["db", "migrate", "--db", db]);
    assert!(
        first.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&first.stderr)
    );
    assert!(stdout(&first).contains("applied 001_hierarchy_and_people"));
    assert!(stdout(&first).contains("3 migration(s) applied"));

    let second = run(temp_dir.path(), &["db", "migrate", "--db", db]);
    assert!(second.status.success());
    assert!(stdout(&second).contains("Schema up to date"));

    let status = run(temp_dir.path(), &["db", "status", "--db", db]);
    assert!(status.status.success());
    let out = stdout(&status);
    assert_eq!(out.lines().count(), 3);
    assert!(out.lines().last().unwrap().starts_with("003_notification_outbox\t"));
}

#[test]
fn test_db_migrate_creates_default_directory() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(temp_dir.path(), &["db", "migrate"]);
    assert!(output.status.success());
    assert!(temp_dir.path().join(".beatwatch/beatwatch.db").exists());
}

#[test]
fn test_db_status_on_missing_database_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(temp_dir.path(), &["db", "status", "--db", "nope.db"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("database not found"));
}

#[test]
fn test_sla_sweep_on_empty_store() {
    let temp_dir = TempDir::new().unwrap();
    let db = db_path(&temp_dir);
    let db = db.to_str().unwrap();

    let text = run(temp_dir.path(), &["sla", "sweep", "--db", db]);
    assert!(text.status.success());
    assert!(stdout(&text).contains("No open breaches"));

    let json = run(temp_dir.path(), &["sla", "sweep", "--json", "--db", db]);
    assert!(json.status.success());
    assert_eq!(stdout(&json).trim(), "[]");
}

#[test]
fn test_sla_alert_unknown_id_reports_error() {
    let temp_dir = TempDir::new().unwrap();
    let db = db_path(&temp_dir);
    let output = run(
        temp_dir.path(),
        &["sla", "alert", "missing-alert", "--db", db.to_str().unwrap()],
    );
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error:"), "stderr: {}", stderr);
    assert!(stderr.contains("missing-alert"));
}

#[test]
fn test_notify_dispatch_drains_outbox() {
    let temp_dir = TempDir::new().unwrap();
    let db = db_path(&temp_dir);
    {
        let conn = db::open_migrated(&db).unwrap();
        let n = Notification::to_contact(
            "+15550001",
            NotificationTopic::VisitScheduled,
            "Visit booked",
        );
        OutboxRepo::enqueue(&conn, &n, chrono::Utc::now()).unwrap();
        OutboxRepo::enqueue(&conn, &n, chrono::Utc::now()).unwrap();
    }
    let db = db.to_str().unwrap();

    let output = run(temp_dir.path(), &["notify", "dispatch", "--limit", "1", "--db", db]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "sent: 1, failed: 0");

    let status = run(temp_dir.path(), &["notify", "status", "--db", db]);
    assert!(status.status.success());
    assert_eq!(stdout(&status).trim(), "pending: 1, sent: 1, failed: 0");
}

#[test]
fn test_invalid_config_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("beatwatch.toml");
    std::fs::write(&config, "[sla]\nresponse_minutes = 0\n").unwrap();
    let db = db_path(&temp_dir);

    let output = run(
        temp_dir.path(),
        &[
            "--config",
            config.to_str().unwrap(),
            "sla",
            "sweep",
            "--db",
            db.to_str().unwrap(),
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("response_minutes"));
}

#[test]
fn test_unknown_log_profile_exits_with_usage_code() {
    let temp_dir = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_beatwatch"))
        .current_dir(temp_dir.path())
        .args(["--log", "verbose", "db", "migrate"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}
