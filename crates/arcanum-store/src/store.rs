// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Value store lifecycle: create, unlock, put, get, and purge secret values.
//!
//! The store uses a key-wrapping pattern:
//! - A random master key encrypts all persisted values.
//! - The master key itself is encrypted with a key derived from the
//!   operator's passphrase via Argon2id (stored in backend metadata as
//!   `wrapped_master_key`).
//! - Changing the passphrase only re-wraps the master key; individual
//!   values are never re-encrypted.
//!
//! Ephemeral values bypass all of this: they live in a process-local map
//! and never reach the backend in any form.

use std::sync::Arc;
use std::time::Duration;

use arcanum_config::model::StoreConfig;
use arcanum_core::{ArcanumError, SecretUuid, ValueBackend};
use dashmap::DashMap;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto;
use crate::kdf::{self, KdfParams};

const META_WRAPPED_MASTER_KEY: &str = "wrapped_master_key";
const META_MASTER_KEY_NONCE: &str = "master_key_nonce";
const META_KDF_SALT: &str = "kdf_salt";
const META_KDF_PARAMS: &str = "kdf_params";

/// Backoff before the single retry on a transient backend outage.
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// The unlocked value store, holding the master key in memory.
///
/// Operations on one UUID are serialized through a per-UUID mutex;
/// distinct UUIDs proceed independently.
pub struct ValueStore {
    /// The unwrapped master key -- only in memory, never on the backend.
    master_key: Zeroizing<[u8; 32]>,
    backend: Arc<dyn ValueBackend>,
    /// Ephemeral values. Never persisted, gone when the process exits.
    ephemeral: DashMap<SecretUuid, Zeroizing<Vec<u8>>>,
    /// Per-UUID operation locks. Entries are kept for the store lifetime.
    locks: DashMap<SecretUuid, Arc<Mutex<()>>>,
    /// Size ceiling in bytes for persisted values.
    max_value_size: usize,
}

impl std::fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueStore")
            .field("master_key", &"[REDACTED]")
            .field("max_value_size", &self.max_value_size)
            .finish()
    }
}

impl ValueStore {
    /// Check if a store exists on this backend (has a wrapped master key).
    pub async fn exists(backend: &dyn ValueBackend) -> Result<bool, ArcanumError> {
        Ok(backend.get_meta(META_WRAPPED_MASTER_KEY).await?.is_some())
    }

    /// Create a new store with a random master key wrapped by the passphrase.
    pub async fn create(
        backend: Arc<dyn ValueBackend>,
        passphrase: &SecretString,
        config: &StoreConfig,
    ) -> Result<Self, ArcanumError> {
        if Self::exists(backend.as_ref()).await? {
            return Err(ArcanumError::Config(
                "a store already exists on this backend".to_string(),
            ));
        }

        let master_key = crypto::random_key()?;

        let salt = kdf::generate_salt()?;
        let params = KdfParams::from_config(config);
        let wrapping_key = params.derive(passphrase.expose_secret().as_bytes(), &salt)?;

        let (wrapped_master_key, wrap_nonce) = crypto::seal(&wrapping_key, &*master_key)?;
        let params_bytes = serde_json::to_vec(&params)
            .map_err(|e| ArcanumError::Internal(format!("failed to encode KDF params: {e}")))?;

        backend
            .put_meta(META_WRAPPED_MASTER_KEY, &wrapped_master_key)
            .await?;
        backend.put_meta(META_MASTER_KEY_NONCE, &wrap_nonce).await?;
        backend.put_meta(META_KDF_SALT, &salt).await?;
        backend.put_meta(META_KDF_PARAMS, &params_bytes).await?;

        info!("value store created");
        Ok(Self {
            master_key,
            backend,
            ephemeral: DashMap::new(),
            locks: DashMap::new(),
            max_value_size: config.max_value_size,
        })
    }

    /// Unlock an existing store by deriving the wrapping key from the
    /// passphrase and decrypting the stored master key.
    pub async fn unlock(
        backend: Arc<dyn ValueBackend>,
        passphrase: &SecretString,
        config: &StoreConfig,
    ) -> Result<Self, ArcanumError> {
        let wrapped_master_key = require_meta(backend.as_ref(), META_WRAPPED_MASTER_KEY).await?;
        let nonce_bytes = require_meta(backend.as_ref(), META_MASTER_KEY_NONCE).await?;
        let salt_bytes = require_meta(backend.as_ref(), META_KDF_SALT).await?;
        let params_bytes = require_meta(backend.as_ref(), META_KDF_PARAMS).await?;

        let params: KdfParams = serde_json::from_slice(&params_bytes)
            .map_err(|e| ArcanumError::Crypto(format!("corrupted KDF params: {e}")))?;
        let salt: [u8; 16] = salt_bytes
            .try_into()
            .map_err(|_| ArcanumError::Crypto("corrupted salt (expected 16 bytes)".to_string()))?;
        let nonce: [u8; crypto::NONCE_LEN] = nonce_bytes.try_into().map_err(|_| {
            ArcanumError::Crypto("corrupted nonce (expected 12 bytes)".to_string())
        })?;

        let wrapping_key = params.derive(passphrase.expose_secret().as_bytes(), &salt)?;

        let master_key_bytes = crypto::open(&wrapping_key, &nonce, &wrapped_master_key)
            .map_err(|_| {
                ArcanumError::Crypto(
                    "invalid passphrase or corrupted store -- decryption failed".to_string(),
                )
            })?;

        let master_key: [u8; 32] = master_key_bytes.as_slice().try_into().map_err(|_| {
            ArcanumError::Crypto("corrupted master key (expected 32 bytes)".to_string())
        })?;

        debug!("value store unlocked");
        Ok(Self {
            master_key: Zeroizing::new(master_key),
            backend,
            ephemeral: DashMap::new(),
            locks: DashMap::new(),
            max_value_size: config.max_value_size,
        })
    }

    /// Store a value for a secret, overwriting any existing one.
    ///
    /// Persisted values are encrypted with the master key and subject to
    /// the configured size ceiling; the write is durable before this
    /// returns. Ephemeral values are held in memory only and unbounded.
    /// Empty values are accepted.
    pub async fn put(
        &self,
        uuid: SecretUuid,
        value: &[u8],
        ephemeral: bool,
    ) -> Result<(), ArcanumError> {
        let lock = self.lock_for(uuid);
        let _guard = lock.lock().await;

        if ephemeral {
            self.ephemeral
                .insert(uuid, Zeroizing::new(value.to_vec()));
            debug!(uuid = %uuid, len = value.len(), "ephemeral value stored");
            return Ok(());
        }

        if value.len() > self.max_value_size {
            return Err(ArcanumError::ValueTooLarge {
                size: value.len(),
                limit: self.max_value_size,
            });
        }

        let (ciphertext, nonce) = crypto::seal(&self.master_key, value)?;
        let mut blob = Vec::with_capacity(crypto::NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);

        self.put_value_retrying(uuid, &blob).await?;
        debug!(uuid = %uuid, len = value.len(), "value stored");
        Ok(())
    }

    /// Retrieve and decrypt the value for a secret.
    ///
    /// Fails with [`ArcanumError::ValueNotSet`] if no value was ever
    /// stored -- a defined secret without a value is a valid state.
    pub async fn get(&self, uuid: SecretUuid) -> Result<Zeroizing<Vec<u8>>, ArcanumError> {
        let lock = self.lock_for(uuid);
        let _guard = lock.lock().await;

        if let Some(value) = self.ephemeral.get(&uuid) {
            return Ok(value.clone());
        }

        let blob = self
            .get_value_retrying(uuid)
            .await?
            .ok_or(ArcanumError::ValueNotSet(uuid))?;

        if blob.len() < crypto::NONCE_LEN {
            return Err(ArcanumError::Crypto(
                "corrupted value blob (shorter than nonce)".to_string(),
            ));
        }
        let nonce: [u8; crypto::NONCE_LEN] = blob[..crypto::NONCE_LEN]
            .try_into()
            .map_err(|_| ArcanumError::Crypto("corrupted value blob".to_string()))?;
        crypto::open(&self.master_key, &nonce, &blob[crypto::NONCE_LEN..])
    }

    /// Remove any stored value for a secret. Idempotent.
    pub async fn purge(&self, uuid: SecretUuid) -> Result<(), ArcanumError> {
        let lock = self.lock_for(uuid);
        let _guard = lock.lock().await;

        self.ephemeral.remove(&uuid);
        self.delete_value_retrying(uuid).await?;
        debug!(uuid = %uuid, "value purged");
        Ok(())
    }

    /// Change the store passphrase by re-wrapping the master key.
    ///
    /// Stored values are NOT re-encrypted -- only the wrapper changes.
    pub async fn change_passphrase(
        &self,
        new_passphrase: &SecretString,
        config: &StoreConfig,
    ) -> Result<(), ArcanumError> {
        let new_salt = kdf::generate_salt()?;
        let params = KdfParams::from_config(config);
        let new_wrapping_key = params.derive(new_passphrase.expose_secret().as_bytes(), &new_salt)?;

        let (new_wrapped_key, new_nonce) = crypto::seal(&new_wrapping_key, &*self.master_key)?;
        let params_bytes = serde_json::to_vec(&params)
            .map_err(|e| ArcanumError::Internal(format!("failed to encode KDF params: {e}")))?;

        self.backend
            .put_meta(META_WRAPPED_MASTER_KEY, &new_wrapped_key)
            .await?;
        self.backend
            .put_meta(META_MASTER_KEY_NONCE, &new_nonce)
            .await?;
        self.backend.put_meta(META_KDF_SALT, &new_salt).await?;
        self.backend.put_meta(META_KDF_PARAMS, &params_bytes).await?;

        info!("store passphrase changed");
        Ok(())
    }

    /// Returns the underlying backend, for registry record persistence.
    pub fn backend(&self) -> &Arc<dyn ValueBackend> {
        &self.backend
    }

    fn lock_for(&self, uuid: SecretUuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(uuid)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn put_value_retrying(&self, uuid: SecretUuid, blob: &[u8]) -> Result<(), ArcanumError> {
        match self.backend.put_value(uuid, blob).await {
            Err(e) if e.is_retryable() => {
                warn!(uuid = %uuid, error = %e, "backend unavailable on put, retrying once");
                tokio::time::sleep(RETRY_BACKOFF).await;
                self.backend.put_value(uuid, blob).await
            }
            other => other,
        }
    }

    async fn get_value_retrying(
        &self,
        uuid: SecretUuid,
    ) -> Result<Option<Vec<u8>>, ArcanumError> {
        match self.backend.get_value(uuid).await {
            Err(e) if e.is_retryable() => {
                warn!(uuid = %uuid, error = %e, "backend unavailable on get, retrying once");
                tokio::time::sleep(RETRY_BACKOFF).await;
                self.backend.get_value(uuid).await
            }
            other => other,
        }
    }

    async fn delete_value_retrying(&self, uuid: SecretUuid) -> Result<(), ArcanumError> {
        match self.backend.delete_value(uuid).await {
            Err(e) if e.is_retryable() => {
                warn!(uuid = %uuid, error = %e, "backend unavailable on delete, retrying once");
                tokio::time::sleep(RETRY_BACKOFF).await;
                self.backend.delete_value(uuid).await
            }
            other => other,
        }
    }
}

/// Read a required metadata key, failing with a setup error if absent.
async fn require_meta(backend: &dyn ValueBackend, key: &str) -> Result<Vec<u8>, ArcanumError> {
    backend.get_meta(key).await?.ok_or_else(|| {
        ArcanumError::Config(format!(
            "store is not initialized (missing `{key}`) -- create it first"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, SqliteBackend};
    use tempfile::tempdir;

    /// Low-cost KDF parameters for fast tests.
    fn test_config() -> StoreConfig {
        StoreConfig {
            database_path: String::new(),
            wal_mode: true,
            max_value_size: 256,
            kdf_memory_cost: 32768,
            kdf_iterations: 2,
            kdf_parallelism: 1,
        }
    }

    fn passphrase(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    async fn open_memory_store() -> (ValueStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = ValueStore::create(backend.clone(), &passphrase("test-pass"), &test_config())
            .await
            .unwrap();
        (store, backend)
    }

    #[tokio::test]
    async fn create_and_unlock_lifecycle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let backend = Arc::new(
            SqliteBackend::open(path.to_str().unwrap(), true)
                .await
                .unwrap(),
        );
        let config = test_config();
        let uuid = SecretUuid::generate();

        assert!(!ValueStore::exists(backend.as_ref()).await.unwrap());

        let store = ValueStore::create(backend.clone(), &passphrase("pass"), &config)
            .await
            .unwrap();
        assert!(ValueStore::exists(backend.as_ref()).await.unwrap());

        store.put(uuid, b"vol-key-bytes", false).await.unwrap();
        drop(store);

        // Simulates process restart: unlock with the same passphrase.
        let store = ValueStore::unlock(backend, &passphrase("pass"), &config)
            .await
            .unwrap();
        assert_eq!(&*store.get(uuid).await.unwrap(), b"vol-key-bytes");
    }

    #[tokio::test]
    async fn create_twice_is_rejected() {
        let backend = Arc::new(MemoryBackend::new());
        ValueStore::create(backend.clone(), &passphrase("p"), &test_config())
            .await
            .unwrap();
        let result = ValueStore::create(backend, &passphrase("p"), &test_config()).await;
        assert!(matches!(result, Err(ArcanumError::Config(_))));
    }

    #[tokio::test]
    async fn wrong_passphrase_fails_with_clear_error() {
        let backend = Arc::new(MemoryBackend::new());
        ValueStore::create(backend.clone(), &passphrase("correct"), &test_config())
            .await
            .unwrap();

        let result = ValueStore::unlock(backend, &passphrase("wrong"), &test_config()).await;
        let err = result.unwrap_err();
        assert!(
            err.to_string().contains("invalid passphrase"),
            "error should mention passphrase: {err}"
        );
    }

    #[tokio::test]
    async fn put_get_roundtrip_exact_bytes() {
        let (store, _) = open_memory_store().await;
        let uuid = SecretUuid::generate();
        let value: Vec<u8> = (0u8..=255).collect();

        store.put(uuid, &value, false).await.unwrap();
        assert_eq!(&*store.get(uuid).await.unwrap(), value.as_slice());
    }

    #[tokio::test]
    async fn empty_value_is_accepted() {
        let (store, _) = open_memory_store().await;
        let uuid = SecretUuid::generate();

        store.put(uuid, b"", false).await.unwrap();
        assert!(store.get(uuid).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_before_any_put_is_value_not_set() {
        let (store, _) = open_memory_store().await;
        let uuid = SecretUuid::generate();

        let result = store.get(uuid).await;
        assert!(matches!(result, Err(ArcanumError::ValueNotSet(u)) if u == uuid));
    }

    #[tokio::test]
    async fn oversized_persisted_value_is_rejected() {
        let (store, _) = open_memory_store().await;
        let uuid = SecretUuid::generate();
        let oversized = vec![0u8; 257];

        let result = store.put(uuid, &oversized, false).await;
        assert!(matches!(
            result,
            Err(ArcanumError::ValueTooLarge {
                size: 257,
                limit: 256
            })
        ));
    }

    #[tokio::test]
    async fn ephemeral_values_are_not_size_limited() {
        let (store, _) = open_memory_store().await;
        let uuid = SecretUuid::generate();
        let oversized = vec![0u8; 1024];

        store.put(uuid, &oversized, true).await.unwrap();
        assert_eq!(store.get(uuid).await.unwrap().len(), 1024);
    }

    #[tokio::test]
    async fn ephemeral_values_never_reach_the_backend() {
        let (store, backend) = open_memory_store().await;
        let uuid = SecretUuid::generate();

        store.put(uuid, b"never-on-disk", true).await.unwrap();
        assert!(backend.get_value(uuid).await.unwrap().is_none());
        assert_eq!(&*store.get(uuid).await.unwrap(), b"never-on-disk");
    }

    #[tokio::test]
    async fn persisted_blob_is_ciphertext() {
        let (store, backend) = open_memory_store().await;
        let uuid = SecretUuid::generate();
        let value = b"plaintext-credential";

        store.put(uuid, value, false).await.unwrap();
        let blob = backend.get_value(uuid).await.unwrap().unwrap();
        assert!(
            !blob.windows(value.len()).any(|w| w == value),
            "plaintext must not appear in the stored blob"
        );
    }

    #[tokio::test]
    async fn overwrite_replaces_value() {
        let (store, _) = open_memory_store().await;
        let uuid = SecretUuid::generate();

        store.put(uuid, b"first", false).await.unwrap();
        store.put(uuid, b"second", false).await.unwrap();
        assert_eq!(&*store.get(uuid).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn purge_is_idempotent_and_removes_value() {
        let (store, _) = open_memory_store().await;
        let uuid = SecretUuid::generate();

        // Purging a never-set value is not an error.
        store.purge(uuid).await.unwrap();

        store.put(uuid, b"gone soon", false).await.unwrap();
        store.purge(uuid).await.unwrap();
        assert!(matches!(
            store.get(uuid).await,
            Err(ArcanumError::ValueNotSet(_))
        ));

        store.purge(uuid).await.unwrap();
    }

    #[tokio::test]
    async fn purge_removes_ephemeral_value() {
        let (store, _) = open_memory_store().await;
        let uuid = SecretUuid::generate();

        store.put(uuid, b"in-memory", true).await.unwrap();
        store.purge(uuid).await.unwrap();
        assert!(matches!(
            store.get(uuid).await,
            Err(ArcanumError::ValueNotSet(_))
        ));
    }

    #[tokio::test]
    async fn single_outage_is_retried_transparently() {
        let (store, backend) = open_memory_store().await;
        let uuid = SecretUuid::generate();

        backend.inject_outages(1);
        store.put(uuid, b"made it", false).await.unwrap();
        assert_eq!(&*store.get(uuid).await.unwrap(), b"made it");
    }

    #[tokio::test]
    async fn persistent_outage_surfaces_after_one_retry() {
        let (store, backend) = open_memory_store().await;
        let uuid = SecretUuid::generate();

        backend.inject_outages(2);
        let result = store.put(uuid, b"never", false).await;
        assert!(matches!(result, Err(ArcanumError::StorageUnavailable(_))));
    }

    #[tokio::test]
    async fn change_passphrase_preserves_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("passwd.db");
        let backend = Arc::new(
            SqliteBackend::open(path.to_str().unwrap(), true)
                .await
                .unwrap(),
        );
        let config = test_config();
        let uuid = SecretUuid::generate();

        let store = ValueStore::create(backend.clone(), &passphrase("old"), &config)
            .await
            .unwrap();
        store.put(uuid, b"survives", false).await.unwrap();
        store
            .change_passphrase(&passphrase("new"), &config)
            .await
            .unwrap();
        drop(store);

        assert!(
            ValueStore::unlock(backend.clone(), &passphrase("old"), &config)
                .await
                .is_err()
        );
        let store = ValueStore::unlock(backend, &passphrase("new"), &config)
            .await
            .unwrap();
        assert_eq!(&*store.get(uuid).await.unwrap(), b"survives");
    }

    #[tokio::test]
    async fn operations_on_distinct_uuids_run_concurrently() {
        let (store, _) = open_memory_store().await;
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let uuid = SecretUuid::generate();
                store.put(uuid, &[i; 32], false).await.unwrap();
                assert_eq!(&*store.get(uuid).await.unwrap(), &[i; 32]);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
