//! Error types for the field-level encryption workflow.

use mongodb::bson;
use std::fmt;
use std::path::PathBuf;

/// Main error type for `csfle` operations.
///
/// Every variant is fatal to the workflow; callers propagate the first one
/// they see after releasing any client they hold.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Local master key could not be loaded
    #[error("invalid local master key")]
    KeyMaterial(#[from] KeyMaterialError),

    /// Namespace string is not of the form `<database>.<collection>`
    #[error("invalid namespace {0:?}: expected \"<database>.<collection>\"")]
    InvalidNamespace(String),

    /// No provider with this name is configured
    #[error("KMS provider not configured: {0}")]
    UnknownKmsProvider(String),

    /// Schema file could not be read
    #[error("failed to read schema file {}", path.display())]
    SchemaRead {
        /// Path of the schema file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Schema file is not valid JSON
    #[error("failed to parse schema file {}", path.display())]
    SchemaJson {
        /// Path of the schema file
        path: PathBuf,
        /// Underlying parse error
        source: serde_json::Error,
    },

    /// Schema file is JSON but not valid extended JSON
    #[error("invalid extended JSON in schema file {}", path.display())]
    SchemaExtJson {
        /// Path of the schema file
        path: PathBuf,
        /// Underlying conversion error
        source: bson::extjson::de::Error,
    },

    /// Schema file holds something other than a JSON object
    #[error("schema file {} does not contain a JSON object", path.display())]
    SchemaNotDocument {
        /// Path of the schema file
        path: PathBuf,
    },

    /// A driver call failed
    #[error("{step} failed")]
    Driver {
        /// The workflow step that failed
        step: Step,
        /// Error reported by the driver
        source: mongodb::error::Error,
    },

    /// The read-back query matched nothing
    #[error("no document found in {0}")]
    DocumentNotFound(String),

    /// A raw BSON document could not be decoded
    #[error("failed to decode document")]
    Decode(#[from] bson::raw::Error),

    /// A document could not be rendered as extended JSON
    #[error("failed to render document")]
    Render(#[from] serde_json::Error),
}

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while loading the local master key.
#[derive(Debug, thiserror::Error)]
pub enum KeyMaterialError {
    /// Input is not valid standard base64
    #[error("malformed base64")]
    Decode(#[from] base64::DecodeError),

    /// Decoded key has the wrong size
    #[error("expected {expected} bytes of key material, got {actual}")]
    InvalidLength {
        /// Required key size
        expected: usize,
        /// Size actually decoded
        actual: usize,
    },
}

/// Identifies the workflow step a driver error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Opening the administrative key-vault connection
    ConnectKeyVault,
    /// Dropping the key-vault collection
    DropKeyVault,
    /// Creating the unique index on `keyAltNames`
    CreateKeyVaultIndex,
    /// Building the explicit-encryption handle
    ClientEncryption,
    /// Creating the data-encryption key
    CreateDataKey,
    /// Opening a plain connection
    Connect,
    /// Opening the auto-encrypting connection
    ConnectEncrypted,
    /// Dropping the target collection
    DropCollection,
    /// Inserting the demo document
    InsertOne,
    /// Reading a document back
    FindOne,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ConnectKeyVault => "connect for key vault client",
            Self::DropKeyVault => "drop key vault collection",
            Self::CreateKeyVaultIndex => "create key vault index",
            Self::ClientEncryption => "new client encryption",
            Self::CreateDataKey => "create data key",
            Self::Connect => "connect",
            Self::ConnectEncrypted => "connect for client with automatic encryption",
            Self::DropCollection => "drop collection",
            Self::InsertOne => "insert one",
            Self::FindOne => "find one",
        };
        f.write_str(name)
    }
}

/// Tags driver results with the step that produced them.
pub trait StepExt<T> {
    /// Converts a driver error into [`Error::Driver`] for `step`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Driver`] if `self` is an error.
    fn at(self, step: Step) -> Result<T>;
}

impl<T> StepExt<T> for mongodb::error::Result<T> {
    fn at(self, step: Step) -> Result<T> {
        self.map_err(|source| Error::Driver { step, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_display_names_the_step() {
        assert_eq!(Step::CreateDataKey.to_string(), "create data key");
        assert_eq!(Step::InsertOne.to_string(), "insert one");
        assert_eq!(
            Step::ConnectEncrypted.to_string(),
            "connect for client with automatic encryption"
        );
    }

    #[test]
    fn test_key_material_error_display() {
        let err = KeyMaterialError::InvalidLength { expected: 96, actual: 32 };
        assert_eq!(err.to_string(), "expected 96 bytes of key material, got 32");

        let err = Error::from(err);
        assert_eq!(err.to_string(), "invalid local master key");
        assert_eq!(
            std::error::Error::source(&err).map(ToString::to_string).as_deref(),
            Some("expected 96 bytes of key material, got 32")
        );
    }

    #[tokio::test]
    async fn test_driver_error_names_step_without_repeating_source() {
        let err = mongodb::options::ClientOptions::parse("not-a-uri")
            .await
            .at(Step::Connect)
            .unwrap_err();

        assert_eq!(err.to_string(), "connect failed");
        assert!(matches!(err, Error::Driver { step: Step::Connect, .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_invalid_namespace_display() {
        let err = Error::InvalidNamespace("foobar".to_string());
        assert_eq!(
            err.to_string(),
            "invalid namespace \"foobar\": expected \"<database>.<collection>\""
        );
    }
}
