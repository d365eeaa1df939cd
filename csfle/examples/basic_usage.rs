//! Basic usage example for `csfle`.
//!
//! Needs `mongod` on `localhost:27017`, `mongocryptd` on the `PATH` and
//! `collection_schema.json` in the working directory.

use csfle::prelude::*;
use csfle::workflow::{encrypted_fields, fetch_stored, render};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("csfle Basic Usage Example");
    println!("=========================\n");

    let key = LocalMasterKey::from_base64(DEMO_LOCAL_MASTER_KEY)?;
    println!("✓ Local master key loaded (fingerprint {})", key.fingerprint());

    let providers = KmsProviders::local(key);
    let settings = Settings::default();

    let document = workflow::run(&settings, &providers).await?;
    println!("✓ Read back through the encrypted client:");
    println!("  {}\n", render(&document)?);

    let stored = fetch_stored(&settings).await?;
    println!("✓ Stored on the server:");
    println!("  {}", render(&stored)?);
    println!("  ciphertext fields: {:?}", encrypted_fields(&stored)?);

    Ok(())
}
