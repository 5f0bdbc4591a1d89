// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session handles and the service facade for the Arcanum secret service.
//!
//! Callers obtain a [`Session`] from the [`SecretService`], scoped by
//! [`SessionGrants`] fixed at open time. Every operation routes through
//! the access guard before touching the registry or the value store.

pub mod service;
pub mod session;

pub use arcanum_access::SessionGrants;
pub use service::SecretService;
pub use session::{SecretHandle, Session};
