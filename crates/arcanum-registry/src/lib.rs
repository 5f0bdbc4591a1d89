// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory secret metadata catalog for the Arcanum secret service.
//!
//! The registry owns every secret's metadata (UUID, usage scope, flags)
//! and enforces the usage uniqueness invariant. It never touches secret
//! values; callers pair it with a value store keyed by the same UUIDs.

pub mod registry;
pub mod xml;

pub use registry::SecretRegistry;
