// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Volatile in-memory [`ValueBackend`].
//!
//! Backs tests and fully-volatile deployments. Supports injecting
//! transient outages so callers can exercise their
//! [`StorageUnavailable`](ArcanumError::StorageUnavailable) retry paths.

use std::sync::atomic::{AtomicUsize, Ordering};

use arcanum_core::{ArcanumError, SecretUuid, ValueBackend};
use async_trait::async_trait;
use dashmap::DashMap;

/// In-memory [`ValueBackend`]. Nothing survives the process.
#[derive(Default)]
pub struct MemoryBackend {
    values: DashMap<SecretUuid, Vec<u8>>,
    meta: DashMap<String, Vec<u8>>,
    records: DashMap<SecretUuid, Vec<u8>>,
    outages: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` backend operations fail with `StorageUnavailable`.
    pub fn inject_outages(&self, n: usize) {
        self.outages.store(n, Ordering::SeqCst);
    }

    fn check_outage(&self) -> Result<(), ArcanumError> {
        let remaining = self
            .outages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if remaining {
            Err(ArcanumError::StorageUnavailable(
                "injected outage".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ValueBackend for MemoryBackend {
    async fn put_value(&self, uuid: SecretUuid, ciphertext: &[u8]) -> Result<(), ArcanumError> {
        self.check_outage()?;
        self.values.insert(uuid, ciphertext.to_vec());
        Ok(())
    }

    async fn get_value(&self, uuid: SecretUuid) -> Result<Option<Vec<u8>>, ArcanumError> {
        self.check_outage()?;
        Ok(self.values.get(&uuid).map(|v| v.clone()))
    }

    async fn delete_value(&self, uuid: SecretUuid) -> Result<(), ArcanumError> {
        self.check_outage()?;
        self.values.remove(&uuid);
        Ok(())
    }

    async fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), ArcanumError> {
        self.check_outage()?;
        self.meta.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, ArcanumError> {
        self.check_outage()?;
        Ok(self.meta.get(key).map(|v| v.clone()))
    }

    async fn put_record(&self, uuid: SecretUuid, record: &[u8]) -> Result<(), ArcanumError> {
        self.check_outage()?;
        self.records.insert(uuid, record.to_vec());
        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<Vec<u8>>, ArcanumError> {
        self.check_outage()?;
        Ok(self.records.iter().map(|r| r.value().clone()).collect())
    }

    async fn delete_record(&self, uuid: SecretUuid) -> Result<(), ArcanumError> {
        self.check_outage()?;
        self.records.remove(&uuid);
        Ok(())
    }
}
