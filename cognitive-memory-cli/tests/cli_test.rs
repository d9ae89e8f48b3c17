//! Exercises the compiled binary end to end against a scratch redb file.

use std::io::Write as _;

use assert_cmd::Command;
use predicates::prelude::*;

fn config_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let db_path = dir.path().join("memory.db");
    let config_path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    writeln!(file, r#"metadata_db_path = "{}""#, db_path.display()).unwrap();
    config_path
}

#[test]
fn store_then_recall_surfaces_the_stored_memory() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_file(&dir);

    Command::cargo_bin("cognitive-memory")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "store", "the launch review went smoothly"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stored memory"));

    Command::cargo_bin("cognitive-memory")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "recall", "launch review"])
        .assert()
        .success()
        .stdout(predicate::str::contains("launch review went smoothly"));
}

#[test]
fn stats_reports_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_file(&dir);

    Command::cargo_bin("cognitive-memory")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "--format", "json", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("connection_count"));
}

#[test]
fn delete_by_source_removes_matching_memories() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_file(&dir);

    Command::cargo_bin("cognitive-memory")
        .unwrap()
        .args([
            "--config",
            config.to_str().unwrap(),
            "store",
            "a note from disk",
            "--source-path",
            "notes/a.md",
        ])
        .assert()
        .success();

    Command::cargo_bin("cognitive-memory")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "delete-by-source", "notes/a.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted 1 memories"));
}

#[test]
fn consolidate_runs_without_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_file(&dir);

    Command::cargo_bin("cognitive-memory")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "consolidate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("evicted"));
}
