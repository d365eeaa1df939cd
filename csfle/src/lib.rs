//! # `csfle`
//!
//! Client-side field-level encryption against MongoDB with a local KMS
//! provider. The driver (through libmongocrypt) does all of the cryptography;
//! this crate handles key material, provisions the data key and configures
//! the auto-encrypting client.
//!
//! ## Workflow
//!
//! 1. Load a 96-byte local master key ([`key_material`])
//! 2. Read the collection's encryption schema ([`schema`])
//! 3. Reset the key vault and create a data key with an alternate name ([`provision`])
//! 4. Open a client with automatic encryption ([`client`])
//! 5. Insert a document with one encrypted field and read it back ([`workflow`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use csfle::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let key = LocalMasterKey::from_base64(DEMO_LOCAL_MASTER_KEY)?;
//! let providers = KmsProviders::local(key);
//! let settings = Settings::default();
//!
//! let document = workflow::run(&settings, &providers).await?;
//! println!("{}", workflow::render(&document)?);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod key_material;
pub mod key_provider;
pub mod provision;
pub mod schema;
pub mod settings;
pub mod workflow;

pub use error::{Error, Result};

pub mod prelude {
    //! Convenience re-exports for common use.
    pub use crate::error::{Error, KeyMaterialError, Result, Step};
    pub use crate::key_material::{LocalMasterKey, DEMO_LOCAL_MASTER_KEY};
    pub use crate::key_provider::{KeyProvider, KmsProviders, LocalKeyProvider};
    pub use crate::settings::{parse_namespace, DropPolicy, Settings};
    pub use crate::workflow::{self, DemoDocument};
}
