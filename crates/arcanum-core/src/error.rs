// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Arcanum secret service.

use thiserror::Error;

use crate::types::{SecretUuid, UsageType};

/// The primary error type used across all Arcanum crates.
///
/// Lifecycle and policy failures carry their specific kind so callers can
/// react per-variant; nothing is coerced to a generic failure on the way up.
#[derive(Debug, Error)]
pub enum ArcanumError {
    /// No secret matches the given UUID or usage pair.
    #[error("secret not found: {0}")]
    NotFound(String),

    /// An active secret already claims the (usage type, usage id) pair.
    #[error("usage scope already claimed: {usage_type}/{usage_id}")]
    Conflict {
        usage_type: UsageType,
        usage_id: String,
    },

    /// The secret exists but no value has ever been stored for it.
    #[error("secret {0} has no value set")]
    ValueNotSet(SecretUuid),

    /// The value exceeds the configured size ceiling for persisted secrets.
    #[error("value of {size} bytes exceeds the configured ceiling of {limit} bytes")]
    ValueTooLarge { size: usize, limit: usize },

    /// The access guard rejected the operation for this session.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The session handle was closed; the operation was not applied.
    #[error("session handle is closed")]
    HandleClosed,

    /// The storage backend is temporarily unavailable. Retryable.
    #[error("storage backend unavailable: {0}")]
    StorageUnavailable(String),

    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Non-transient storage backend errors (corruption, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Key derivation, encryption, or decryption failures.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ArcanumError {
    /// Whether the caller may retry the operation unchanged.
    ///
    /// Only [`ArcanumError::StorageUnavailable`] is transient; every other
    /// variant reports a definite outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ArcanumError::StorageUnavailable(_))
    }
}
