//! CLI tests that run without a database.

use assert_cmd::Command;
use csfle::key_material::LocalMasterKey;
use predicates::prelude::*;

const UNREACHABLE_URI: &str = "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200";

fn csfle() -> Command {
    let mut cmd = Command::cargo_bin("csfle").expect("binary should build");
    cmd.env_remove("CSFLE_LOCAL_MASTER_KEY").env_remove("CSFLE_URI").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_keygen_prints_96_byte_key() {
    let output = csfle().arg("keygen").assert().success().get_output().stdout.clone();
    let encoded = String::from_utf8(output).unwrap();

    assert!(LocalMasterKey::from_base64(encoded.trim()).is_ok(), "bad key: {encoded}");
}

#[test]
fn test_keygen_keys_differ() {
    let first = csfle().arg("keygen").assert().success().get_output().stdout.clone();
    let second = csfle().arg("keygen").assert().success().get_output().stdout.clone();
    assert_ne!(first, second);
}

#[test]
fn test_malformed_master_key_fails() {
    csfle()
        .args(["--uri", UNREACHABLE_URI, "--local-master-key", "not*base64"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("invalid local master key"));
}

#[test]
fn test_short_master_key_checked_before_namespace() {
    csfle()
        .args(["--local-master-key", "c2hvcnQ=", "--namespace", "foobar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected 96 bytes of key material, got 5"));
}

#[test]
fn test_master_key_from_env() {
    csfle()
        .env("CSFLE_LOCAL_MASTER_KEY", "c2hvcnQ=")
        .args(["--uri", UNREACHABLE_URI])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid local master key"));
}

#[test]
fn test_invalid_namespace_fails() {
    csfle()
        .args(["--namespace", "foobar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid namespace \"foobar\""));
}

#[test]
fn test_missing_schema_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let schema = temp_dir.path().join("collection_schema.json");

    csfle()
        .args(["--uri", UNREACHABLE_URI, "--schema"])
        .arg(&schema)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read schema file"));
}
