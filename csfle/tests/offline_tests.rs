//! Workflow tests that fail before any server is contacted.

use csfle::prelude::*;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

/// Nothing listens here; reaching the network would surface as a driver error.
const UNREACHABLE_URI: &str = "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200";

fn demo_providers() -> KmsProviders {
    KmsProviders::local(LocalMasterKey::from_base64(DEMO_LOCAL_MASTER_KEY).unwrap())
}

#[tokio::test]
async fn test_missing_schema_fails_before_provisioning() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let settings = Settings::default()
        .with_uri(UNREACHABLE_URI)
        .with_schema_path(temp_dir.path().join("collection_schema.json"));

    let result = workflow::run(&settings, &demo_providers()).await;
    assert!(matches!(result, Err(Error::SchemaRead { .. })), "got {result:?}");
}

#[tokio::test]
async fn test_malformed_schema_fails_before_provisioning() {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(b"{ \"properties\": { ").unwrap();

    let settings = Settings::default().with_uri(UNREACHABLE_URI).with_schema_path(file.path());

    let result = workflow::run(&settings, &demo_providers()).await;
    assert!(matches!(result, Err(Error::SchemaJson { .. })), "got {result:?}");
}

#[tokio::test]
async fn test_invalid_uri_reported_at_key_vault_step() {
    let settings = Settings::default()
        .with_uri("definitely not a uri")
        .with_schema_path(concat!(env!("CARGO_MANIFEST_DIR"), "/../collection_schema.json"));

    let result = workflow::run(&settings, &demo_providers()).await;
    assert!(
        matches!(result, Err(Error::Driver { step: Step::ConnectKeyVault, .. })),
        "got {result:?}"
    );
}

#[test]
fn test_bad_key_material_rejected() {
    assert!(matches!(
        LocalMasterKey::from_base64("c2hvcnQ="),
        Err(KeyMaterialError::InvalidLength { expected: 96, actual: 5 })
    ));
    assert!(matches!(LocalMasterKey::from_base64("!!!"), Err(KeyMaterialError::Decode(_))));
}
