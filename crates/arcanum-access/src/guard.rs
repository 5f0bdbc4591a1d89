// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The access guard: a pure function of (session grants, usage type,
//! operation).
//!
//! Grants are fixed when a session opens and never change afterwards, so
//! every authorization decision is reproducible from its three inputs --
//! there is no hidden state to mock in tests.

use std::collections::BTreeSet;

use arcanum_core::{ArcanumError, Operation, UsageType};

/// What a session is allowed to touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrants {
    permitted: BTreeSet<UsageType>,
    read_only: bool,
}

impl SessionGrants {
    /// Grants for the given usage types; `read_only` denies all mutation.
    pub fn new(permitted: impl IntoIterator<Item = UsageType>, read_only: bool) -> Self {
        Self {
            permitted: permitted.into_iter().collect(),
            read_only,
        }
    }

    /// Read-write grants over every usage type.
    pub fn allow_all() -> Self {
        Self::new(
            [
                UsageType::Volume,
                UsageType::Ceph,
                UsageType::Iscsi,
                UsageType::None,
            ],
            false,
        )
    }

    pub fn permits(&self, usage_type: UsageType) -> bool {
        self.permitted.contains(&usage_type)
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

/// Why an operation was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// The target secret's usage type is outside the session's grants.
    UsageNotGranted { usage_type: UsageType },
    /// The session holds read-only grants and the operation mutates.
    ReadOnlySession { operation: Operation },
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenyReason::UsageNotGranted { usage_type } => {
                write!(f, "usage type `{usage_type}` is not granted to this session")
            }
            DenyReason::ReadOnlySession { operation } => {
                write!(f, "operation `{operation}` requires a read-write session")
            }
        }
    }
}

/// The outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Convert a denial into the corresponding error.
    pub fn into_result(self) -> Result<(), ArcanumError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(ArcanumError::AccessDenied(reason.to_string())),
        }
    }
}

/// Decide whether a session may perform `operation` against a secret of
/// `usage_type`.
///
/// `List` is catalog-level (UUIDs only, no values, no per-secret
/// metadata) and is always allowed for an open session; every other
/// operation is scoped to the target secret's usage type.
pub fn authorize(
    grants: &SessionGrants,
    usage_type: UsageType,
    operation: Operation,
) -> Decision {
    if operation == Operation::List {
        return Decision::Allow;
    }

    if !grants.permits(usage_type) {
        return Decision::Deny(DenyReason::UsageNotGranted { usage_type });
    }

    if operation.is_mutating() && grants.is_read_only() {
        return Decision::Deny(DenyReason::ReadOnlySession { operation });
    }

    Decision::Allow
}
