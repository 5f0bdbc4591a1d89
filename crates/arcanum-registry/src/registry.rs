// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The secret metadata catalog.
//!
//! Holds every active secret's metadata in memory and enforces the usage
//! scope invariant: no two active secrets share a (usage type, usage id)
//! pair unless the type is `none`. All mutation happens under the write
//! lock, so the check-then-insert in [`SecretRegistry::define`] is atomic.
//! Reads copy out under the read lock, giving callers a consistent
//! point-in-time snapshot.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use arcanum_core::{ArcanumError, DescribeOptions, SecretMeta, SecretUuid, UsageType};
use chrono::Utc;
use tracing::{debug, info};

use crate::xml;

#[derive(Default)]
struct Inner {
    catalog: HashMap<SecretUuid, SecretMeta>,
    /// Maps each claimed (usage type, usage id) pair to its owner.
    /// Secrets with usage type `none` are never indexed here.
    usage_index: HashMap<(UsageType, String), SecretUuid>,
}

/// In-memory catalog of secret metadata; mediates all lifecycle transitions.
///
/// The registry never sees secret values -- those belong to the value
/// store, keyed by the UUIDs handed out here.
#[derive(Default)]
pub struct SecretRegistry {
    inner: RwLock<Inner>,
}

impl SecretRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new secret in "defined, no value" state.
    ///
    /// Allocates a fresh v4 UUID. Fails with [`ArcanumError::Conflict`] if
    /// an active secret already claims the (usage type, usage id) pair and
    /// the type is not `none`.
    pub fn define(
        &self,
        usage_type: UsageType,
        usage_id: &str,
        ephemeral: bool,
        private: bool,
    ) -> Result<SecretMeta, ArcanumError> {
        let mut inner = self.write();

        if usage_type != UsageType::None
            && inner
                .usage_index
                .contains_key(&(usage_type, usage_id.to_string()))
        {
            return Err(ArcanumError::Conflict {
                usage_type,
                usage_id: usage_id.to_string(),
            });
        }

        let meta = SecretMeta {
            uuid: SecretUuid::generate(),
            usage_type,
            usage_id: usage_id.to_string(),
            ephemeral,
            private,
            created_at: Utc::now(),
        };

        if usage_type != UsageType::None {
            inner
                .usage_index
                .insert((usage_type, usage_id.to_string()), meta.uuid);
        }
        inner.catalog.insert(meta.uuid, meta.clone());

        info!(uuid = %meta.uuid, usage_type = %usage_type, usage_id = %usage_id, "secret defined");
        Ok(meta)
    }

    /// Insert an existing record, preserving its UUID. Hydration entry
    /// point used when reloading persisted definitions at service open.
    ///
    /// Enforces the same invariants as [`define`](Self::define).
    pub fn insert(&self, meta: SecretMeta) -> Result<(), ArcanumError> {
        let mut inner = self.write();

        if inner.catalog.contains_key(&meta.uuid) {
            return Err(ArcanumError::Internal(format!(
                "duplicate secret record for UUID {}",
                meta.uuid
            )));
        }
        if meta.usage_type != UsageType::None
            && inner
                .usage_index
                .contains_key(&(meta.usage_type, meta.usage_id.clone()))
        {
            return Err(ArcanumError::Conflict {
                usage_type: meta.usage_type,
                usage_id: meta.usage_id,
            });
        }

        if meta.usage_type != UsageType::None {
            inner
                .usage_index
                .insert((meta.usage_type, meta.usage_id.clone()), meta.uuid);
        }
        debug!(uuid = %meta.uuid, "secret record hydrated");
        inner.catalog.insert(meta.uuid, meta);
        Ok(())
    }

    /// Look up a secret by UUID.
    pub fn lookup_by_uuid(&self, uuid: SecretUuid) -> Result<SecretMeta, ArcanumError> {
        self.read()
            .catalog
            .get(&uuid)
            .cloned()
            .ok_or_else(|| ArcanumError::NotFound(uuid.to_string()))
    }

    /// Look up a secret by its usage scope. Exact, case-sensitive match.
    ///
    /// Secrets with usage type `none` are not indexed and cannot be found
    /// this way.
    pub fn lookup_by_usage(
        &self,
        usage_type: UsageType,
        usage_id: &str,
    ) -> Result<SecretMeta, ArcanumError> {
        let inner = self.read();
        inner
            .usage_index
            .get(&(usage_type, usage_id.to_string()))
            .and_then(|uuid| inner.catalog.get(uuid))
            .cloned()
            .ok_or_else(|| ArcanumError::NotFound(format!("{usage_type}/{usage_id}")))
    }

    /// List all active secret UUIDs. Snapshot at call time; mutations after
    /// the call returns are not reflected.
    pub fn list(&self) -> Vec<SecretUuid> {
        self.read().catalog.keys().copied().collect()
    }

    /// Remove a secret's record, returning the removed metadata so the
    /// caller can purge the associated value.
    pub fn undefine(&self, uuid: SecretUuid) -> Result<SecretMeta, ArcanumError> {
        let mut inner = self.write();

        let meta = inner
            .catalog
            .remove(&uuid)
            .ok_or_else(|| ArcanumError::NotFound(uuid.to_string()))?;
        if meta.usage_type != UsageType::None {
            inner
                .usage_index
                .remove(&(meta.usage_type, meta.usage_id.clone()));
        }

        info!(uuid = %uuid, "secret undefined");
        Ok(meta)
    }

    /// Synthesize the XML descriptor for a secret.
    ///
    /// The value is never embedded. For a secret marked private, the usage
    /// name is withheld unless `opts.include_private`.
    pub fn describe_xml(
        &self,
        uuid: SecretUuid,
        opts: DescribeOptions,
    ) -> Result<String, ArcanumError> {
        let meta = self.lookup_by_uuid(uuid)?;
        xml::describe(&meta, opts)
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
