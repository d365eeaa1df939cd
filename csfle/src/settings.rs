//! Run settings for the encryption workflow.
//!
//! Defaults reproduce the fixed local setup: a server at
//! `mongodb://localhost:27017`, keys in `keyvault.__datakeys`, documents in
//! `foo.bar` and the schema in `collection_schema.json`.

use crate::error::{Error, Result};
use crate::key_provider::LOCAL_PROVIDER;
use mongodb::Namespace;
use std::path::{Path, PathBuf};

/// Default connection string.
pub const DEFAULT_URI: &str = "mongodb://localhost:27017";

/// Default key-vault namespace.
pub const DEFAULT_KEY_VAULT_NAMESPACE: &str = "keyvault.__datakeys";

/// Default target namespace.
pub const DEFAULT_NAMESPACE: &str = "foo.bar";

/// Default schema file, relative to the working directory.
pub const DEFAULT_SCHEMA_PATH: &str = "collection_schema.json";

/// Default alternate name for the data key.
pub const DEFAULT_KEY_ALT_NAME: &str = "altname";

/// How failures while dropping a collection are treated.
///
/// A missing collection is never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropPolicy {
    /// Log any other failure and continue.
    #[default]
    Tolerant,
    /// Any other failure aborts the run.
    Strict,
}

/// Parses `"<database>.<collection>"` into a [`Namespace`].
///
/// The split happens at the first dot, so collection names may contain dots.
///
/// # Errors
///
/// Returns `Error::InvalidNamespace` if there is no dot or either side is empty.
///
/// # Example
///
/// ```
/// use csfle::settings::parse_namespace;
///
/// let ns = parse_namespace("keyvault.__datakeys").unwrap();
/// assert_eq!(ns.db, "keyvault");
/// assert_eq!(ns.coll, "__datakeys");
/// ```
pub fn parse_namespace(value: &str) -> Result<Namespace> {
    match value.split_once('.') {
        Some((db, coll)) if !db.is_empty() && !coll.is_empty() => Ok(Namespace::new(db, coll)),
        _ => Err(Error::InvalidNamespace(value.to_string())),
    }
}

/// Settings shared by every step of the workflow.
#[derive(Debug, Clone)]
pub struct Settings {
    uri: String,
    key_vault_namespace: Namespace,
    namespace: Namespace,
    schema_path: PathBuf,
    key_alt_name: String,
    kms_provider: String,
    drop_policy: DropPolicy,
    crypt_shared_lib_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            key_vault_namespace: Namespace::new("keyvault", "__datakeys"),
            namespace: Namespace::new("foo", "bar"),
            schema_path: PathBuf::from(DEFAULT_SCHEMA_PATH),
            key_alt_name: DEFAULT_KEY_ALT_NAME.to_string(),
            kms_provider: LOCAL_PROVIDER.to_string(),
            drop_policy: DropPolicy::default(),
            crypt_shared_lib_path: None,
        }
    }
}

impl Settings {
    /// Sets the connection string.
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    /// Sets the key-vault namespace.
    #[must_use]
    pub fn with_key_vault_namespace(mut self, namespace: Namespace) -> Self {
        self.key_vault_namespace = namespace;
        self
    }

    /// Sets the namespace documents are written to.
    #[must_use]
    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = namespace;
        self
    }

    /// Sets the schema file path.
    #[must_use]
    pub fn with_schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_path = path.into();
        self
    }

    /// Sets the alternate name given to the data key.
    #[must_use]
    pub fn with_key_alt_name(mut self, name: impl Into<String>) -> Self {
        self.key_alt_name = name.into();
        self
    }

    /// Sets the KMS provider that wraps the data key.
    #[must_use]
    pub fn with_kms_provider(mut self, name: impl Into<String>) -> Self {
        self.kms_provider = name.into();
        self
    }

    /// Sets the drop policy.
    #[must_use]
    pub const fn with_drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Points the driver at a `crypt_shared` library instead of `mongocryptd`.
    #[must_use]
    pub fn with_crypt_shared_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.crypt_shared_lib_path = Some(path.into());
        self
    }

    /// Returns the connection string.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the key-vault namespace.
    #[must_use]
    pub const fn key_vault_namespace(&self) -> &Namespace {
        &self.key_vault_namespace
    }

    /// Returns the target namespace.
    #[must_use]
    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns the schema file path.
    #[must_use]
    pub fn schema_path(&self) -> &Path {
        &self.schema_path
    }

    /// Returns the data key's alternate name.
    #[must_use]
    pub fn key_alt_name(&self) -> &str {
        &self.key_alt_name
    }

    /// Returns the KMS provider name.
    #[must_use]
    pub fn kms_provider(&self) -> &str {
        &self.kms_provider
    }

    /// Returns the drop policy.
    #[must_use]
    pub const fn drop_policy(&self) -> DropPolicy {
        self.drop_policy
    }

    /// Returns the `crypt_shared` library path, if set.
    #[must_use]
    pub fn crypt_shared_lib_path(&self) -> Option<&Path> {
        self.crypt_shared_lib_path.as_deref()
    }
}
