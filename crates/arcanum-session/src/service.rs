// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The service facade: owns the shared registry and value store, opens
//! sessions, and hydrates persisted secret definitions at startup.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arcanum_access::SessionGrants;
use arcanum_core::{ArcanumError, SecretMeta};
use arcanum_registry::SecretRegistry;
use arcanum_store::ValueStore;
use tracing::info;

use crate::session::Session;

/// The secret lifecycle management service.
///
/// One instance per unlocked store. Sessions opened here share the
/// registry and store; each carries its own grants.
pub struct SecretService {
    registry: Arc<SecretRegistry>,
    store: Arc<ValueStore>,
    open_count: Arc<AtomicUsize>,
    max_sessions: usize,
}

impl SecretService {
    /// Open the service over an unlocked value store.
    ///
    /// Replays every persisted definition record into the registry.
    /// Ephemeral secrets were never persisted, so after a restart they are
    /// simply absent; persisted secrets re-appear with their values intact.
    pub async fn open(store: ValueStore, max_sessions: usize) -> Result<Self, ArcanumError> {
        let registry = Arc::new(SecretRegistry::new());

        let records = store.backend().list_records().await?;
        let count = records.len();
        for record in records {
            let meta: SecretMeta = serde_json::from_slice(&record).map_err(|e| {
                ArcanumError::Storage {
                    source: format!("corrupted secret record: {e}").into(),
                }
            })?;
            registry.insert(meta)?;
        }
        if count > 0 {
            info!(count, "registry hydrated from persisted records");
        }

        Ok(Self {
            registry,
            store: Arc::new(store),
            open_count: Arc::new(AtomicUsize::new(0)),
            max_sessions,
        })
    }

    /// Open a new session with the given grants.
    ///
    /// Fails once `max_sessions` sessions are open; closing (or dropping)
    /// a session frees its slot.
    pub fn open_session(&self, grants: SessionGrants) -> Result<Session, ArcanumError> {
        let claimed = self
            .open_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_sessions).then_some(n + 1)
            })
            .is_ok();
        if !claimed {
            return Err(ArcanumError::AccessDenied(format!(
                "session limit ({}) reached",
                self.max_sessions
            )));
        }

        Ok(Session::new(
            grants,
            self.registry.clone(),
            self.store.clone(),
            self.open_count.clone(),
        ))
    }

    /// Number of currently open sessions.
    pub fn open_sessions(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }
}
