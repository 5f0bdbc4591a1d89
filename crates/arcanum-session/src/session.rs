// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-connection sessions and the secret handles they issue.
//!
//! A [`Session`] is the unit of access-grant scoping and handle lifetime.
//! Its state machine is `Open -> Closed`, one-directional. Every
//! [`SecretHandle`] issued through a session shares the session's inner
//! state: once the session closes, all outstanding handles fail with
//! [`ArcanumError::HandleClosed`] instead of silently operating on
//! registry state.
//!
//! Ownership is explicit: the session inner is `Arc`-shared between the
//! session and its handles, and the open-session slot is released
//! deterministically on [`Session::close`] or when the last reference
//! drops -- there is no finalizer-driven cleanup.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use arcanum_access::{SessionGrants, authorize};
use arcanum_core::{
    ArcanumError, DescribeOptions, Operation, SecretMeta, SecretUuid, SessionId, UsageType,
};
use arcanum_registry::SecretRegistry;
use arcanum_store::ValueStore;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

pub(crate) struct SessionInner {
    id: SessionId,
    grants: SessionGrants,
    closed: AtomicBool,
    registry: Arc<SecretRegistry>,
    store: Arc<ValueStore>,
    /// Service-wide open-session counter; decremented exactly once.
    open_count: Arc<AtomicUsize>,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        // Last reference gone without an explicit close: release the slot.
        if !self.closed.load(Ordering::SeqCst) {
            self.open_count.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// A caller's connection to the secret service.
///
/// Cheap to clone; all clones share one open/closed state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub(crate) fn new(
        grants: SessionGrants,
        registry: Arc<SecretRegistry>,
        store: Arc<ValueStore>,
        open_count: Arc<AtomicUsize>,
    ) -> Self {
        let id = SessionId::generate();
        debug!(session = %id, "session opened");
        Self {
            inner: Arc::new(SessionInner {
                id,
                grants,
                closed: AtomicBool::new(false),
                registry,
                store,
                open_count,
            }),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.inner.id
    }

    pub fn is_open(&self) -> bool {
        !self.inner.closed.load(Ordering::SeqCst)
    }

    /// Close the session. Idempotent; terminal.
    ///
    /// Safe to call concurrently with in-flight operations on this
    /// session's handles: each operation either completes with its full
    /// result or observes the closure and fails with
    /// [`ArcanumError::HandleClosed`].
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            self.inner.open_count.fetch_sub(1, Ordering::SeqCst);
            info!(session = %self.inner.id, "session closed");
        }
    }

    fn ensure_open(&self) -> Result<(), ArcanumError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(ArcanumError::HandleClosed)
        }
    }

    fn authorize(&self, usage_type: UsageType, operation: Operation) -> Result<(), ArcanumError> {
        authorize(&self.inner.grants, usage_type, operation).into_result()
    }

    /// Authorized metadata lookup shared by the per-secret operations.
    fn resolve(
        &self,
        uuid: SecretUuid,
        operation: Operation,
    ) -> Result<SecretMeta, ArcanumError> {
        self.ensure_open()?;
        let meta = self.inner.registry.lookup_by_uuid(uuid)?;
        self.authorize(meta.usage_type, operation)?;
        Ok(meta)
    }

    /// Define a new secret in "defined, no value" state.
    ///
    /// Non-ephemeral definitions are written through to the backend before
    /// this returns; a failed write rolls the registry insert back so the
    /// catalog and the backend never disagree.
    pub async fn define(
        &self,
        usage_type: UsageType,
        usage_id: &str,
        ephemeral: bool,
        private: bool,
    ) -> Result<SecretHandle, ArcanumError> {
        self.ensure_open()?;
        self.authorize(usage_type, Operation::Define)?;

        let meta = self
            .inner
            .registry
            .define(usage_type, usage_id, ephemeral, private)?;

        if !ephemeral {
            let record = serde_json::to_vec(&meta).map_err(|e| {
                ArcanumError::Internal(format!("failed to encode secret record: {e}"))
            })?;
            if let Err(e) = self
                .inner
                .store
                .backend()
                .put_record(meta.uuid, &record)
                .await
            {
                // Roll back so a later retry of define can succeed.
                let _ = self.inner.registry.undefine(meta.uuid);
                return Err(e);
            }
        }

        Ok(self.handle_for(meta))
    }

    /// Look up a secret by UUID.
    pub fn lookup_by_uuid(&self, uuid: SecretUuid) -> Result<SecretHandle, ArcanumError> {
        let meta = self.resolve(uuid, Operation::Lookup)?;
        Ok(self.handle_for(meta))
    }

    /// Look up a secret by usage scope. Exact, case-sensitive match.
    pub fn lookup_by_usage(
        &self,
        usage_type: UsageType,
        usage_id: &str,
    ) -> Result<SecretHandle, ArcanumError> {
        self.ensure_open()?;
        self.authorize(usage_type, Operation::Lookup)?;
        let meta = self.inner.registry.lookup_by_usage(usage_type, usage_id)?;
        Ok(self.handle_for(meta))
    }

    /// List all active secret UUIDs. Snapshot at call time.
    pub fn list(&self) -> Result<Vec<SecretUuid>, ArcanumError> {
        self.ensure_open()?;
        Ok(self.inner.registry.list())
    }

    /// Retrieve the decrypted value of a secret.
    pub async fn get_value(&self, uuid: SecretUuid) -> Result<Zeroizing<Vec<u8>>, ArcanumError> {
        self.resolve(uuid, Operation::GetValue)?;
        self.inner.store.get(uuid).await
    }

    /// Set or replace the value of a secret. Empty values are accepted.
    pub async fn set_value(&self, uuid: SecretUuid, value: &[u8]) -> Result<(), ArcanumError> {
        let meta = self.resolve(uuid, Operation::SetValue)?;
        self.inner.store.put(uuid, value, meta.ephemeral).await
    }

    /// Synthesize the XML descriptor for a secret. Never contains the value.
    pub fn get_xml_desc(
        &self,
        uuid: SecretUuid,
        opts: DescribeOptions,
    ) -> Result<String, ArcanumError> {
        self.resolve(uuid, Operation::GetXmlDesc)?;
        self.inner.registry.describe_xml(uuid, opts)
    }

    /// Remove a secret and purge its stored value. Irreversible.
    ///
    /// The metadata removal is the commit point. A failure while purging
    /// the value or deleting the persisted record afterwards is logged and
    /// accepted; it is not rolled back.
    pub async fn undefine(&self, uuid: SecretUuid) -> Result<(), ArcanumError> {
        let meta = self.resolve(uuid, Operation::Undefine)?;
        self.inner.registry.undefine(uuid)?;

        if !meta.ephemeral
            && let Err(e) = self.inner.store.backend().delete_record(uuid).await
        {
            warn!(uuid = %uuid, error = %e, "failed to delete persisted record after undefine");
        }
        if let Err(e) = self.inner.store.purge(uuid).await {
            warn!(uuid = %uuid, error = %e, "failed to purge value after undefine");
        }
        Ok(())
    }

    fn handle_for(&self, meta: SecretMeta) -> SecretHandle {
        SecretHandle {
            uuid: meta.uuid,
            usage_type: meta.usage_type,
            usage_id: meta.usage_id,
            session: self.clone(),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("open", &self.is_open())
            .finish()
    }
}

/// A secret as seen through one session.
///
/// Holds a reference to the issuing session, so the session stays alive
/// while any handle does -- but a closed session invalidates all of its
/// handles immediately.
#[derive(Debug, Clone)]
pub struct SecretHandle {
    uuid: SecretUuid,
    usage_type: UsageType,
    usage_id: String,
    session: Session,
}

impl SecretHandle {
    pub fn uuid(&self) -> SecretUuid {
        self.uuid
    }

    pub fn usage_type(&self) -> UsageType {
        self.usage_type
    }

    pub fn usage_id(&self) -> &str {
        &self.usage_id
    }

    /// Retrieve the decrypted value.
    pub async fn get_value(&self) -> Result<Zeroizing<Vec<u8>>, ArcanumError> {
        self.session.get_value(self.uuid).await
    }

    /// Set or replace the value.
    pub async fn set_value(&self, value: &[u8]) -> Result<(), ArcanumError> {
        self.session.set_value(self.uuid, value).await
    }

    /// Synthesize the XML descriptor.
    pub fn get_xml_desc(&self, opts: DescribeOptions) -> Result<String, ArcanumError> {
        self.session.get_xml_desc(self.uuid, opts)
    }

    /// Remove the secret and purge its value. The handle is dead afterwards.
    pub async fn undefine(&self) -> Result<(), ArcanumError> {
        self.session.undefine(self.uuid).await
    }
}
