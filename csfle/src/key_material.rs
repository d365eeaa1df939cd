//! Local master key material.
//!
//! The `local` KMS provider wraps data-encryption keys with a 96-byte master
//! key held by the application. This module decodes that key from base64,
//! validates its size and generates fresh keys.

use crate::error::KeyMaterialError;
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretVec};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

/// Size of a local master key in bytes.
pub const LOCAL_MASTER_KEY_SIZE: usize = 96;

/// Demo key material, 96 random bytes in base64.
///
/// Generated by: `echo $(head -c 96 /dev/urandom | base64 | tr -d '\n')`.
/// Only suitable for local experiments.
pub const DEMO_LOCAL_MASTER_KEY: &str = "E7h/7bm+gvHPosEhZLB96Nms4Lrn2zV90vKpVJIo7UMn9112iex7dPeHHKVt088kNr3Zv+ZpBGZTYFI7yVm49eIysA7PwXdZ/QpNcwuw9Ut5rYiXXf4UA8G9fNNkYonQ";

/// Number of digest bytes shown in a fingerprint.
const FINGERPRINT_SIZE: usize = 8;

/// A validated 96-byte master key for the `local` KMS provider.
///
/// The bytes are zeroized on drop and redacted from `Debug` output.
///
/// # Example
///
/// ```
/// use csfle::key_material::{LocalMasterKey, DEMO_LOCAL_MASTER_KEY};
///
/// let key = LocalMasterKey::from_base64(DEMO_LOCAL_MASTER_KEY).unwrap();
/// assert_eq!(key.fingerprint().len(), 16);
/// ```
pub struct LocalMasterKey {
    bytes: SecretVec<u8>,
}

impl fmt::Debug for LocalMasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LocalMasterKey([REDACTED])")
    }
}

impl LocalMasterKey {
    /// Decodes a standard base64 string into a master key.
    ///
    /// # Errors
    ///
    /// Returns `KeyMaterialError::Decode` for malformed base64 and
    /// `KeyMaterialError::InvalidLength` if the decoded key is not 96 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyMaterialError> {
        let decoded = STANDARD.decode(encoded.trim())?;
        Self::from_bytes(decoded)
    }

    /// Wraps raw key bytes, checking their size.
    ///
    /// # Errors
    ///
    /// Returns `KeyMaterialError::InvalidLength` if `bytes` is not 96 bytes long.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, KeyMaterialError> {
        let bytes = Zeroizing::new(bytes);
        if bytes.len() != LOCAL_MASTER_KEY_SIZE {
            return Err(KeyMaterialError::InvalidLength {
                expected: LOCAL_MASTER_KEY_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes: SecretVec::new(bytes.to_vec()) })
    }

    /// Generates a new random master key from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; LOCAL_MASTER_KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes: SecretVec::new(bytes) }
    }

    /// Encodes the key as standard base64.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.bytes.expose_secret())
    }

    /// Returns a short hex fingerprint (truncated SHA-256) safe to log.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.bytes.expose_secret());
        hex::encode(&digest[..FINGERPRINT_SIZE])
    }

    /// Exposes the raw key bytes.
    ///
    /// Only the KMS provider configuration should call this.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.bytes.expose_secret()
    }
}
