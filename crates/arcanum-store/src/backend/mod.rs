// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`ValueBackend`] implementations.
//!
//! The SQLite backend is the durable production backend; the in-memory
//! backend backs tests and fully-volatile deployments.
//!
//! [`ValueBackend`]: arcanum_core::ValueBackend

pub mod memory;
pub mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
