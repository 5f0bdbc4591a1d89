// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Arcanum workspace.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Identity of a secret: a 128-bit v4 UUID, immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretUuid(pub Uuid);

impl SecretUuid {
    /// Allocate a fresh cryptographically random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SecretUuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SecretUuid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Unique identifier for a caller session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Allocate a fresh random session identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What a secret is used for.
///
/// A closed set: adding a backend type is one new variant here (the strum
/// and serde derives pick it up), not a change to registry or store logic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UsageType {
    /// Storage volume encryption secret.
    Volume,
    /// Ceph RBD client secret.
    Ceph,
    /// iSCSI CHAP initiator secret.
    Iscsi,
    /// Unscoped secret; the (type, id) uniqueness invariant does not apply.
    None,
}

/// Operations a session can request against the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Define,
    Lookup,
    List,
    GetValue,
    SetValue,
    GetXmlDesc,
    Undefine,
}

impl Operation {
    /// Whether the operation changes registry or store state.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Operation::Define | Operation::SetValue | Operation::Undefine
        )
    }
}

/// Metadata record for one secret.
///
/// The value itself is never part of this record; it lives only in the
/// value store, keyed by `uuid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretMeta {
    /// Immutable identity.
    pub uuid: SecretUuid,
    /// Usage scope type.
    pub usage_type: UsageType,
    /// Opaque usage identifier, unique within `usage_type` (unless `None`).
    pub usage_id: String,
    /// When true, the value is held in memory only and never persisted.
    pub ephemeral: bool,
    /// When true, sensitive metadata is excluded from descriptor exports.
    pub private: bool,
    /// Definition timestamp.
    pub created_at: DateTime<Utc>,
}

/// Per-call options for descriptor synthesis.
///
/// Replaces an untyped `flags` argument: every recognized option is an
/// explicit field.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescribeOptions {
    /// Include metadata fields that the `private` flag normally withholds.
    pub include_private: bool,
}
