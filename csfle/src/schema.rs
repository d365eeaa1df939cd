//! Encryption schema loading.
//!
//! The schema is a JSON Schema document in extended JSON that marks which
//! fields of a collection are encrypted, with which algorithm and key. Field
//! order is preserved because the driver interprets it as a BSON document.

use crate::error::{Error, Result};
use mongodb::bson::{Bson, Document};
use mongodb::Namespace;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Maps a fully-qualified collection name (`"db.coll"`) to its schema.
pub type SchemaMap = BTreeMap<String, Document>;

/// Reads and parses an extended JSON file into a document.
///
/// # Errors
///
/// Returns:
/// - `Error::SchemaRead` if the file cannot be read
/// - `Error::SchemaJson` if it is not valid JSON
/// - `Error::SchemaExtJson` if extended JSON values are malformed
/// - `Error::SchemaNotDocument` if the top level is not an object
pub fn read_json_file(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let content = fs::read(path)
        .map_err(|source| Error::SchemaRead { path: path.to_path_buf(), source })?;
    parse_ext_json(&content, path)
}

fn parse_ext_json(content: &[u8], path: &Path) -> Result<Document> {
    let value: serde_json::Value = serde_json::from_slice(content)
        .map_err(|source| Error::SchemaJson { path: path.to_path_buf(), source })?;

    match Bson::try_from(value) {
        Ok(Bson::Document(document)) => Ok(document),
        Ok(_) => Err(Error::SchemaNotDocument { path: path.to_path_buf() }),
        Err(source) => Err(Error::SchemaExtJson { path: path.to_path_buf(), source }),
    }
}

/// Builds a schema map with a single entry for `namespace`.
#[must_use]
pub fn schema_map(namespace: &Namespace, schema: Document) -> SchemaMap {
    let mut map = SchemaMap::new();
    map.insert(namespace.to_string(), schema);
    map
}
