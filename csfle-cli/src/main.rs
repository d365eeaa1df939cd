//! `csfle` CLI for the MongoDB client-side field-level encryption workflow.

#![warn(clippy::pedantic, clippy::nursery)]

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use csfle::prelude::*;
use csfle::provision::create_data_key;
use csfle::settings::{
    DEFAULT_KEY_ALT_NAME, DEFAULT_KEY_VAULT_NAMESPACE, DEFAULT_NAMESPACE, DEFAULT_SCHEMA_PATH,
    DEFAULT_URI,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "csfle")]
#[command(about = "MongoDB client-side field-level encryption demo", long_about = None)]
struct Cli {
    #[command(flatten)]
    options: Options,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct Options {
    /// MongoDB connection string
    #[arg(long, env = "CSFLE_URI", default_value = DEFAULT_URI, global = true)]
    uri: String,

    /// Key vault namespace (<database>.<collection>)
    #[arg(long, default_value = DEFAULT_KEY_VAULT_NAMESPACE, global = true)]
    key_vault_namespace: String,

    /// Target namespace (<database>.<collection>)
    #[arg(long, default_value = DEFAULT_NAMESPACE, global = true)]
    namespace: String,

    /// Extended JSON schema for the target collection
    #[arg(long, default_value = DEFAULT_SCHEMA_PATH, global = true)]
    schema: PathBuf,

    /// Alternate name given to the data key
    #[arg(long, default_value = DEFAULT_KEY_ALT_NAME, global = true)]
    key_alt_name: String,

    /// Base64-encoded 96-byte local master key
    #[arg(
        long,
        env = "CSFLE_LOCAL_MASTER_KEY",
        default_value = DEMO_LOCAL_MASTER_KEY,
        hide_default_value = true,
        hide_env_values = true,
        global = true
    )]
    local_master_key: String,

    /// Use the crypt_shared library at this path instead of mongocryptd
    #[arg(long, global = true)]
    crypt_shared_lib_path: Option<PathBuf>,

    /// Fail when dropping a collection fails for any reason other than absence
    #[arg(long, global = true)]
    strict_drop: bool,
}

impl Options {
    fn providers(&self) -> csfle::Result<KmsProviders> {
        let key = LocalMasterKey::from_base64(&self.local_master_key)?;
        Ok(KmsProviders::local(key))
    }

    fn settings(&self) -> csfle::Result<Settings> {
        let drop_policy = if self.strict_drop { DropPolicy::Strict } else { DropPolicy::Tolerant };
        let mut settings = Settings::default()
            .with_uri(&self.uri)
            .with_key_vault_namespace(parse_namespace(&self.key_vault_namespace)?)
            .with_namespace(parse_namespace(&self.namespace)?)
            .with_schema_path(&self.schema)
            .with_key_alt_name(&self.key_alt_name)
            .with_drop_policy(drop_policy);
        if let Some(path) = &self.crypt_shared_lib_path {
            settings = settings.with_crypt_shared_lib_path(path);
        }
        Ok(settings)
    }

    /// Key material is checked before settings so a bad key fails first.
    fn load(&self) -> csfle::Result<(Settings, KmsProviders)> {
        let providers = self.providers()?;
        Ok((self.settings()?, providers))
    }
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Provision a data key, insert an encrypted document and print it back (default)
    Run,
    /// Reset the key vault and create a data key only
    CreateKey,
    /// Generate a new random local master key
    Keygen,
    /// Print the stored document as the server sees it, without decryption
    Inspect,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "csfle=debug" } else { "csfle=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let (settings, providers) = cli.options.load()?;
            let document = workflow::run(&settings, &providers).await?;
            println!("{}", workflow::render(&document)?);
        }
        Commands::CreateKey => {
            let (settings, providers) = cli.options.load()?;
            let key_id = create_data_key(&settings, &providers)
                .await
                .context("data key provisioning failed")?;
            println!("{}", hex::encode(key_id.bytes));
        }
        Commands::Keygen => {
            println!("{}", LocalMasterKey::generate().to_base64());
        }
        Commands::Inspect => {
            let settings = cli.options.settings()?;
            let document = workflow::fetch_stored(&settings).await?;
            let fields = workflow::encrypted_fields(&document)?;
            info!(namespace = %settings.namespace(), ciphertext_fields = ?fields, "read stored document");
            println!("{}", workflow::render(&document)?);
        }
    }

    Ok(())
}
