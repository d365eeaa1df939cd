//! Client construction and collection helpers.

use crate::error::{Result, Step, StepExt};
use crate::key_provider::KmsProviders;
use crate::schema::SchemaMap;
use crate::settings::{DropPolicy, Settings};
use mongodb::bson::{doc, Document};
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use tracing::{debug, info, warn};

/// Server error code for a missing namespace.
const NAMESPACE_NOT_FOUND: i32 = 26;

/// Opens a plain connection without automatic encryption.
///
/// # Errors
///
/// Returns `Error::Driver` tagged with `step` if the URI is invalid or the
/// client cannot be created.
pub async fn connect(settings: &Settings, step: Step) -> Result<Client> {
    Client::with_uri_str(settings.uri()).await.at(step)
}

/// Opens a connection that encrypts and decrypts fields automatically.
///
/// Writes to fields marked in `schema_map` are encrypted before they leave the
/// process; reads decrypt them with data keys from the key vault, unwrapped
/// through `providers`. The caller owns the returned client and should call
/// [`Client::shutdown`] once it is done.
///
/// # Errors
///
/// Returns `Error::Driver` with `Step::ConnectEncrypted` if the options are
/// invalid or the encryption library cannot be loaded.
pub async fn create_encrypted_client(
    settings: &Settings,
    providers: &KmsProviders,
    schema_map: SchemaMap,
) -> Result<Client> {
    let options = ClientOptions::parse(settings.uri()).await.at(Step::ConnectEncrypted)?;

    let client = Client::encrypted_builder(
        options,
        settings.key_vault_namespace().clone(),
        providers.to_driver(),
    )
    .at(Step::ConnectEncrypted)?
    .schema_map(schema_map)
    .extra_options(extra_options(settings))
    .build()
    .await
    .at(Step::ConnectEncrypted)?;

    info!(namespace = %settings.namespace(), "connected with automatic encryption");
    Ok(client)
}

fn extra_options(settings: &Settings) -> Option<Document> {
    settings.crypt_shared_lib_path().map(|path| {
        doc! { "cryptSharedLibPath": path.to_string_lossy().into_owned() }
    })
}

/// Drops a collection, treating a missing collection as success.
///
/// Under [`DropPolicy::Tolerant`] any other failure is logged and ignored;
/// under [`DropPolicy::Strict`] it is returned.
///
/// # Errors
///
/// Returns `Error::Driver` tagged with `step` only under `DropPolicy::Strict`.
pub async fn drop_collection<T: Send + Sync>(
    collection: &Collection<T>,
    policy: DropPolicy,
    step: Step,
) -> Result<()> {
    match collection.drop().await {
        Ok(()) => {
            debug!(namespace = %collection.namespace(), "dropped collection");
            Ok(())
        }
        Err(err) if is_namespace_not_found(&err) => {
            debug!(namespace = %collection.namespace(), "collection did not exist");
            Ok(())
        }
        Err(err) => match policy {
            DropPolicy::Strict => Err(err).at(step),
            DropPolicy::Tolerant => {
                warn!(namespace = %collection.namespace(), error = %err, "ignoring {step} failure");
                Ok(())
            }
        },
    }
}

fn is_namespace_not_found(err: &mongodb::error::Error) -> bool {
    matches!(&*err.kind, ErrorKind::Command(command) if command.code == NAMESPACE_NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::path::Path;

    #[test]
    fn test_no_extra_options_by_default() {
        assert!(extra_options(&Settings::default()).is_none());
    }

    #[test]
    fn test_crypt_shared_path_in_extra_options() {
        let settings = Settings::default().with_crypt_shared_lib_path("/opt/mongo_crypt_v1.so");
        let extra = extra_options(&settings).unwrap();

        assert_eq!(extra.get_str("cryptSharedLibPath").unwrap(), "/opt/mongo_crypt_v1.so");
        assert_eq!(settings.crypt_shared_lib_path(), Some(Path::new("/opt/mongo_crypt_v1.so")));
    }

    /// Nothing listens here; every server operation times out.
    const UNREACHABLE_URI: &str = "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200";

    async fn unreachable_collection() -> (Client, Collection<Document>) {
        let settings = Settings::default().with_uri(UNREACHABLE_URI);
        let client = connect(&settings, Step::Connect).await.unwrap();
        let collection = client.database("foo").collection("bar");
        (client, collection)
    }

    #[tokio::test]
    async fn test_tolerant_drop_ignores_failure() {
        let (client, collection) = unreachable_collection().await;

        let result = drop_collection(&collection, DropPolicy::Tolerant, Step::DropCollection).await;
        client.shutdown().await;

        assert!(result.is_ok(), "got {result:?}");
    }

    #[tokio::test]
    async fn test_strict_drop_reports_failure() {
        let (client, collection) = unreachable_collection().await;

        let result = drop_collection(&collection, DropPolicy::Strict, Step::DropCollection).await;
        client.shutdown().await;

        assert!(
            matches!(result, Err(Error::Driver { step: Step::DropCollection, .. })),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn test_server_selection_error_is_not_namespace_not_found() {
        let (client, collection) = unreachable_collection().await;

        let err = collection.drop().await.unwrap_err();
        client.shutdown().await;

        assert!(!is_namespace_not_found(&err));
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_uri() {
        let settings = Settings::default().with_uri("not-a-uri");
        let result = connect(&settings, Step::Connect).await;

        assert!(matches!(result, Err(Error::Driver { step: Step::Connect, .. })));
    }
}
