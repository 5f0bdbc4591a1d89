// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argon2id key derivation from a passphrase.
//!
//! Derives the 32-byte wrapping key that protects the store master key.
//! Parameters come from [`StoreConfig`] at creation time and are persisted
//! alongside the salt so unlock always replays the exact same derivation.

use arcanum_config::model::StoreConfig;
use arcanum_core::ArcanumError;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Argon2id cost parameters, persisted as JSON in store metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Iteration count.
    pub iterations: u32,
    /// Parallelism lanes.
    pub parallelism: u32,
}

impl KdfParams {
    /// Parameters for a newly created store, taken from configuration.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            memory_cost: config.kdf_memory_cost,
            iterations: config.kdf_iterations,
            parallelism: config.kdf_parallelism,
        }
    }

    /// Derive a 32-byte wrapping key from `passphrase` and `salt`.
    ///
    /// The returned key is wrapped in [`Zeroizing`] for automatic memory
    /// zeroing on drop.
    pub fn derive(
        &self,
        passphrase: &[u8],
        salt: &[u8; 16],
    ) -> Result<Zeroizing<[u8; 32]>, ArcanumError> {
        let params =
            argon2::Params::new(self.memory_cost, self.iterations, self.parallelism, Some(32))
                .map_err(|e| ArcanumError::Crypto(format!("invalid Argon2id parameters: {e}")))?;

        let argon2 =
            argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

        let mut output = Zeroizing::new([0u8; 32]);
        argon2
            .hash_password_into(passphrase, salt, output.as_mut())
            .map_err(|e| ArcanumError::Crypto(format!("Argon2id key derivation failed: {e}")))?;

        Ok(output)
    }
}

/// Generate a random 16-byte salt for Argon2id.
pub fn generate_salt() -> Result<[u8; 16], ArcanumError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; 16];
    rng.fill(&mut salt)
        .map_err(|_| ArcanumError::Crypto("failed to generate random salt".to_string()))?;
    Ok(salt)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Low-cost parameters for fast tests.
    fn test_params() -> KdfParams {
        KdfParams {
            memory_cost: 32768,
            iterations: 2,
            parallelism: 1,
        }
    }

    #[test]
    fn same_inputs_derive_the_same_key() {
        let salt = [1u8; 16];
        let key1 = test_params().derive(b"test passphrase", &salt).unwrap();
        let key2 = test_params().derive(b"test passphrase", &salt).unwrap();
        assert_eq!(*key1, *key2);
    }

    #[test]
    fn different_passphrases_derive_different_keys() {
        let salt = [2u8; 16];
        let key1 = test_params().derive(b"passphrase one", &salt).unwrap();
        let key2 = test_params().derive(b"passphrase two", &salt).unwrap();
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn different_salts_derive_different_keys() {
        let key1 = test_params().derive(b"same passphrase", &[1u8; 16]).unwrap();
        let key2 = test_params().derive(b"same passphrase", &[2u8; 16]).unwrap();
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn params_json_roundtrip() {
        let params = test_params();
        let json = serde_json::to_vec(&params).unwrap();
        let parsed: KdfParams = serde_json::from_slice(&json).unwrap();
        assert_eq!(params, parsed);
    }

    #[test]
    fn generate_salt_produces_random_values() {
        assert_ne!(generate_salt().unwrap(), generate_salt().unwrap());
    }
}
