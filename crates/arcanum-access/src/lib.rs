// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage-scoped access policy for the Arcanum secret service.

pub mod guard;

pub use guard::{Decision, DenyReason, SessionGrants, authorize};
