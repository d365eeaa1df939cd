//! KMS provider configuration.
//!
//! A [`KeyProvider`] describes one key-management backend in the shape the
//! driver expects: a provider identifier, its settings document, optional TLS
//! options and the master key used when creating data keys. [`KmsProviders`]
//! is the immutable set handed to both the data-key provisioner and the
//! encrypted-client factory.

use crate::error::{Error, Result};
use crate::key_material::LocalMasterKey;
use mongodb::bson::{doc, spec::BinarySubtype, Binary, Document};
use mongodb::client_encryption::{self, MasterKey};
use mongodb::mongocrypt::ctx::KmsProvider;
use mongodb::options::TlsOptions;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Name of the provider backed by an application-held master key.
pub const LOCAL_PROVIDER: &str = "local";

/// Driver-facing description of one KMS provider entry.
pub type ProviderEntry = (KmsProvider, Document, Option<TlsOptions>);

/// Describes a key-management backend to the driver.
///
/// Implementations must be thread-safe (`Send + Sync`) since the driver keeps
/// the provider settings for the lifetime of every client built from them.
pub trait KeyProvider: Send + Sync + fmt::Debug {
    /// Returns the provider name used to look it up (e.g. `"local"`).
    fn name(&self) -> &str;

    /// Returns the driver identifier for this provider.
    fn kms_provider(&self) -> KmsProvider;

    /// Returns the provider-specific settings document.
    ///
    /// For the local provider this is `{ key: <96 raw bytes> }`.
    fn credentials(&self) -> Document;

    /// Returns TLS options for talking to the KMS endpoint, if any.
    fn tls_options(&self) -> Option<TlsOptions> {
        None
    }

    /// Returns the master key that wraps data keys created under this provider.
    fn master_key(&self) -> MasterKey;

    /// Returns a loggable fingerprint of the master key, if the provider holds one.
    fn fingerprint(&self) -> Option<String> {
        None
    }
}

/// Provider that wraps data keys with a locally held 96-byte master key.
#[derive(Debug)]
pub struct LocalKeyProvider {
    key: LocalMasterKey,
}

impl LocalKeyProvider {
    /// Creates a local provider from validated key material.
    #[must_use]
    pub const fn new(key: LocalMasterKey) -> Self {
        Self { key }
    }
}

impl KeyProvider for LocalKeyProvider {
    fn name(&self) -> &str {
        LOCAL_PROVIDER
    }

    fn kms_provider(&self) -> KmsProvider {
        KmsProvider::local()
    }

    fn credentials(&self) -> Document {
        doc! {
            "key": Binary { subtype: BinarySubtype::Generic, bytes: self.key.expose().to_vec() },
        }
    }

    fn master_key(&self) -> MasterKey {
        MasterKey::Local(client_encryption::LocalMasterKey::builder().build())
    }

    fn fingerprint(&self) -> Option<String> {
        Some(self.key.fingerprint())
    }
}

/// Immutable set of KMS providers keyed by name.
///
/// Cloning is cheap; providers are shared.
///
/// # Example
///
/// ```
/// use csfle::key_material::{LocalMasterKey, DEMO_LOCAL_MASTER_KEY};
/// use csfle::key_provider::KmsProviders;
///
/// let key = LocalMasterKey::from_base64(DEMO_LOCAL_MASTER_KEY).unwrap();
/// let providers = KmsProviders::local(key);
/// assert!(providers.get("local").is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct KmsProviders {
    providers: BTreeMap<String, Arc<dyn KeyProvider>>,
}

impl KmsProviders {
    /// Creates an empty provider set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding only the `local` provider.
    #[must_use]
    pub fn local(key: LocalMasterKey) -> Self {
        Self::new().with_provider(LocalKeyProvider::new(key))
    }

    /// Adds a provider, replacing any provider with the same name.
    #[must_use]
    pub fn with_provider(mut self, provider: impl KeyProvider + 'static) -> Self {
        self.providers.insert(provider.name().to_string(), Arc::new(provider));
        self
    }

    /// Looks up a provider by name.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownKmsProvider` if no provider has this name.
    pub fn get(&self, name: &str) -> Result<&dyn KeyProvider> {
        self.providers
            .get(name)
            .map(|provider| &**provider)
            .ok_or_else(|| Error::UnknownKmsProvider(name.to_string()))
    }

    /// Returns the configured provider names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Returns the number of configured providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns `true` if no provider is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Builds the provider list in the form the driver accepts.
    #[must_use]
    pub fn to_driver(&self) -> Vec<ProviderEntry> {
        self.providers
            .values()
            .map(|provider| {
                (provider.kms_provider(), provider.credentials(), provider.tls_options())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_material::{DEMO_LOCAL_MASTER_KEY, LOCAL_MASTER_KEY_SIZE};

    fn demo_providers() -> KmsProviders {
        KmsProviders::local(LocalMasterKey::from_base64(DEMO_LOCAL_MASTER_KEY).unwrap())
    }

    #[test]
    fn test_local_credentials_hold_raw_key() {
        let providers = demo_providers();
        let local = providers.get(LOCAL_PROVIDER).unwrap();

        let credentials = local.credentials();
        let key = credentials.get_binary_generic("key").unwrap();
        assert_eq!(key.len(), LOCAL_MASTER_KEY_SIZE);
        assert!(local.tls_options().is_none());
        assert_eq!(local.fingerprint().map(|f| f.len()), Some(16));
    }

    #[test]
    fn test_local_master_key_variant() {
        let providers = demo_providers();
        let local = providers.get(LOCAL_PROVIDER).unwrap();
        assert!(matches!(local.master_key(), MasterKey::Local(_)));
    }

    #[test]
    fn test_unknown_provider() {
        let providers = demo_providers();
        let result = providers.get("aws");
        assert!(matches!(result, Err(Error::UnknownKmsProvider(name)) if name == "aws"));
    }

    #[test]
    fn test_driver_entries() {
        let providers = demo_providers();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers.names().collect::<Vec<_>>(), vec![LOCAL_PROVIDER]);
        assert_eq!(providers.to_driver().len(), 1);
    }

    #[test]
    fn test_replacing_provider_keeps_one_entry() {
        let providers = demo_providers()
            .with_provider(LocalKeyProvider::new(LocalMasterKey::generate()));
        assert_eq!(providers.len(), 1);
    }

    #[test]
    fn test_empty_set() {
        let providers = KmsProviders::new();
        assert!(providers.is_empty());
        assert!(providers.to_driver().is_empty());
    }
}
