//! The end-to-end encryption workflow.
//!
//! [`run`] loads the schema, provisions a fresh data key, opens an
//! auto-encrypting client, resets the target collection, inserts one
//! [`DemoDocument`] and reads it back decrypted. [`fetch_stored`] reads the
//! same collection without encryption to show what the server actually holds.

use crate::client::{connect, create_encrypted_client, drop_collection};
use crate::error::{Error, Result, Step, StepExt};
use crate::key_provider::KmsProviders;
use crate::provision::create_data_key;
use crate::schema::{read_json_file, schema_map};
use crate::settings::Settings;
use mongodb::bson::{doc, spec::BinarySubtype, Binary, Bson, RawDocumentBuf};
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Value written to the plaintext field.
pub const PLAINTEXT_VALUE: &str = "hello world";

/// Value written to the encrypted field.
pub const ENCRYPTED_VALUE: &str = "encrypted";

/// Document inserted by the workflow.
///
/// `encrypted_field` is stored as ciphertext when the schema marks it;
/// `altname` carries the data key's alternate name so a schema can refer to
/// the key with the JSON pointer `"/altname"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoDocument {
    /// Stored as given.
    pub plaintext: String,
    /// Encrypted by the driver before it is sent.
    pub encrypted_field: String,
    /// Alternate name of the data key.
    pub altname: String,
}

impl DemoDocument {
    /// Creates the demo document for a data key with this alternate name.
    #[must_use]
    pub fn new(key_alt_name: impl Into<String>) -> Self {
        Self {
            plaintext: PLAINTEXT_VALUE.to_string(),
            encrypted_field: ENCRYPTED_VALUE.to_string(),
            altname: key_alt_name.into(),
        }
    }
}

/// Runs the whole workflow and returns the document as read back.
///
/// The schema is read before anything touches the server, so a missing or
/// malformed schema leaves the key vault and target collection untouched.
/// The encrypted client is shut down before returning on every path.
///
/// # Errors
///
/// Returns the first error from schema loading, provisioning, client
/// construction, insert or find. Returns `Error::DocumentNotFound` if the
/// collection is empty after the insert.
pub async fn run(settings: &Settings, providers: &KmsProviders) -> Result<RawDocumentBuf> {
    let schema = read_json_file(settings.schema_path())?;
    info!(path = %settings.schema_path().display(), "loaded encryption schema");

    create_data_key(settings, providers).await?;

    let schema_map = schema_map(settings.namespace(), schema);
    let client = create_encrypted_client(settings, providers, schema_map).await?;
    let result = insert_and_read(&client, settings).await;
    client.shutdown().await;

    result
}

async fn insert_and_read(client: &Client, settings: &Settings) -> Result<RawDocumentBuf> {
    let namespace = settings.namespace();
    let collection: Collection<DemoDocument> =
        client.database(&namespace.db).collection(&namespace.coll);

    drop_collection(&collection, settings.drop_policy(), Step::DropCollection).await?;

    let document = DemoDocument::new(settings.key_alt_name());
    collection.insert_one(&document).await.at(Step::InsertOne)?;
    info!(namespace = %namespace, "inserted document");

    find_first(&collection.clone_with_type()).await
}

/// Reads the stored document through a plain client without decryption.
///
/// Fields the schema encrypts come back as BSON binary subtype 6.
///
/// # Errors
///
/// Returns `Error::Driver` if the connection or query fails and
/// `Error::DocumentNotFound` if the collection is empty.
pub async fn fetch_stored(settings: &Settings) -> Result<RawDocumentBuf> {
    let client = connect(settings, Step::Connect).await?;
    let namespace = settings.namespace();
    let collection = client.database(&namespace.db).collection(&namespace.coll);

    let result = find_first(&collection).await;
    client.shutdown().await;

    result
}

async fn find_first(collection: &Collection<RawDocumentBuf>) -> Result<RawDocumentBuf> {
    collection
        .find_one(doc! {})
        .await
        .at(Step::FindOne)?
        .ok_or_else(|| Error::DocumentNotFound(collection.namespace().to_string()))
}

/// Renders a raw document as single-line relaxed extended JSON.
///
/// # Errors
///
/// Returns `Error::Decode` if the raw bytes are not a valid document.
pub fn render(document: &RawDocumentBuf) -> Result<String> {
    let json = Bson::Document(document.to_document()?).into_relaxed_extjson();
    Ok(serde_json::to_string(&json)?)
}

/// Returns `true` if the value is client-side encrypted ciphertext.
#[must_use]
pub fn is_encrypted_value(value: &Bson) -> bool {
    matches!(value, Bson::Binary(Binary { subtype: BinarySubtype::Encrypted, .. }))
}

/// Lists the top-level fields that hold ciphertext.
///
/// # Errors
///
/// Returns `Error::Decode` if the raw bytes are not a valid document.
pub fn encrypted_fields(document: &RawDocumentBuf) -> Result<Vec<String>> {
    let document = document.to_document()?;
    Ok(document
        .iter()
        .filter(|(_, value)| is_encrypted_value(value))
        .map(|(key, _)| key.clone())
        .collect())
}
