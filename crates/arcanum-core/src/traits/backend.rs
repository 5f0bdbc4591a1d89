// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable byte-storage seam consumed by the value store.

use async_trait::async_trait;

use crate::error::ArcanumError;
use crate::types::SecretUuid;

/// Durable key-value byte storage, keyed by secret UUID.
///
/// The backend owns all durability for the service: encrypted secret
/// values, store bootstrap material (wrapped master key, KDF salt and
/// parameters), and serialized secret definition records. Every `put_*`
/// and `delete_*` method must be durable before it returns; there is no
/// deferred flush the caller has to trigger.
///
/// Transient failures (backend busy, connection lost) are reported as
/// [`ArcanumError::StorageUnavailable`] so callers can retry; everything
/// else surfaces as [`ArcanumError::Storage`].
#[async_trait]
pub trait ValueBackend: Send + Sync {
    /// Store the ciphertext for a secret, replacing any previous value.
    async fn put_value(&self, uuid: SecretUuid, ciphertext: &[u8]) -> Result<(), ArcanumError>;

    /// Fetch the stored ciphertext for a secret, or `None` if absent.
    async fn get_value(&self, uuid: SecretUuid) -> Result<Option<Vec<u8>>, ArcanumError>;

    /// Remove the stored ciphertext for a secret. Idempotent.
    async fn delete_value(&self, uuid: SecretUuid) -> Result<(), ArcanumError>;

    /// Store a named piece of store metadata (key wrapping material).
    async fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), ArcanumError>;

    /// Fetch a named piece of store metadata, or `None` if absent.
    async fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, ArcanumError>;

    /// Store a serialized secret definition record, replacing any previous one.
    async fn put_record(&self, uuid: SecretUuid, record: &[u8]) -> Result<(), ArcanumError>;

    /// Fetch all stored definition records, for registry hydration at open.
    async fn list_records(&self) -> Result<Vec<Vec<u8>>, ArcanumError>;

    /// Remove the definition record for a secret. Idempotent.
    async fn delete_record(&self, uuid: SecretUuid) -> Result<(), ArcanumError>;
}
