//! End-to-end runs of the `hyperschema` binary over temporary files.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn hyperschema(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hyperschema"))
        .current_dir(dir)
        .env_remove("HYPERSCHEMA_ALL_OF_SUB_ERRORS")
        .env_remove("HYPERSCHEMA_REGEX_VALIDATOR")
        .args(args)
        .output()
        .expect("binary runs")
}

fn setup() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("schema.json"),
        r#"{
            "type": "object",
            "required": ["name"],
            "properties": { "name": { "type": "string", "pattern": "^[a-z]+$" } }
        }"#,
    )
    .unwrap();
    fs::write(dir.path().join("good.yaml"), "name: app\n").unwrap();
    fs::write(dir.path().join("bad.json"), r#"{ "name": "App" }"#).unwrap();
    dir
}

#[test]
fn valid_data_exits_zero() {
    let dir = setup();
    let out = hyperschema(dir.path(), &["validate", "--schema", "schema.json", "good.yaml"]);
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "good.yaml: valid\n");
}

#[test]
fn invalid_data_exits_one() {
    let dir = setup();
    let out = hyperschema(
        dir.path(),
        &["validate", "--schema", "schema.json", "good.yaml", "bad.json"],
    );
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("bad.json: invalid"));
    assert!(stdout.contains("#/name: \"App\" does not match ^[a-z]+$."));
}

#[test]
fn json_output_is_machine_readable() {
    let dir = setup();
    let out = hyperschema(
        dir.path(),
        &["validate", "--json", "--schema", "schema.json", "bad.json"],
    );
    assert_eq!(out.status.code(), Some(1));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["valid"], serde_json::json!(false));
    assert_eq!(report["errors"][0]["kind"], serde_json::json!("pattern-failed"));
}

#[test]
fn missing_schema_exits_two() {
    let dir = setup();
    let out = hyperschema(dir.path(), &["validate", "--schema", "nope.json", "good.yaml"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("nope.json"));
}
