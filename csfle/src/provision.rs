//! Data-key provisioning.
//!
//! Provisioning resets the key vault and creates one data-encryption key
//! under the configured KMS provider. Every run starts from an empty key
//! vault; documents encrypted under keys from earlier runs can no longer be
//! decrypted afterwards.

use crate::client::{connect, drop_collection};
use crate::error::{Result, Step, StepExt};
use crate::key_provider::{KeyProvider, KmsProviders};
use crate::settings::Settings;
use mongodb::bson::{doc, Binary, Document};
use mongodb::client_encryption::ClientEncryption;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use tracing::info;

/// Resets the key vault and creates a data key tagged with the configured
/// alternate name.
///
/// A dedicated connection is used for the key vault and is shut down before
/// returning, whether provisioning succeeded or not.
///
/// # Returns
///
/// The new key's id (a UUID binary).
///
/// # Errors
///
/// Returns:
/// - `Error::UnknownKmsProvider` if the configured provider is missing
/// - `Error::Driver` for connection, index or key-creation failures, and for
///   drop failures under `DropPolicy::Strict`
pub async fn create_data_key(settings: &Settings, providers: &KmsProviders) -> Result<Binary> {
    let provider = providers.get(settings.kms_provider())?;

    let key_vault_client = connect(settings, Step::ConnectKeyVault).await?;
    let result = provision(&key_vault_client, settings, providers, provider).await;
    key_vault_client.shutdown().await;

    result
}

async fn provision(
    client: &Client,
    settings: &Settings,
    providers: &KmsProviders,
    provider: &dyn KeyProvider,
) -> Result<Binary> {
    let namespace = settings.key_vault_namespace();
    let key_vault: Collection<Document> =
        client.database(&namespace.db).collection(&namespace.coll);

    drop_collection(&key_vault, settings.drop_policy(), Step::DropKeyVault).await?;
    key_vault.create_index(key_alt_names_index()).await.at(Step::CreateKeyVaultIndex)?;

    let client_encryption =
        ClientEncryption::new(client.clone(), namespace.clone(), providers.to_driver())
            .at(Step::ClientEncryption)?;

    let key_id = client_encryption
        .create_data_key(provider.master_key())
        .key_alt_names(vec![settings.key_alt_name().to_string()])
        .await
        .at(Step::CreateDataKey)?;

    let fingerprint = provider.fingerprint().unwrap_or_else(|| "-".to_string());
    info!(
        key_id = %hex::encode(&key_id.bytes),
        key_alt_name = settings.key_alt_name(),
        kms_provider = provider.name(),
        master_key = %fingerprint,
        "created data key"
    );
    Ok(key_id)
}

/// Unique index that keeps alternate names from being reused.
fn key_alt_names_index() -> IndexModel {
    let options = IndexOptions::builder()
        .unique(true)
        .partial_filter_expression(doc! { "keyAltNames": { "$exists": true } })
        .build();
    IndexModel::builder().keys(doc! { "keyAltNames": 1 }).options(options).build()
}
