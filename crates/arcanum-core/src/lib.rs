// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Arcanum secret service.
//!
//! This crate provides the error taxonomy, common types, and the durable
//! storage trait seam used throughout the Arcanum workspace. The service
//! crates (store, registry, access, session) all build on the definitions
//! here and never redefine them.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ArcanumError;
pub use traits::ValueBackend;
pub use types::{
    DescribeOptions, Operation, SecretMeta, SecretUuid, SessionId, UsageType,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_carry_their_kind() {
        let not_found = ArcanumError::NotFound("deadbeef".into());
        assert!(not_found.to_string().contains("not found"));

        let conflict = ArcanumError::Conflict {
            usage_type: UsageType::Volume,
            usage_id: "vol1".into(),
        };
        assert!(conflict.to_string().contains("volume/vol1"));

        let too_large = ArcanumError::ValueTooLarge {
            size: 100,
            limit: 10,
        };
        assert!(too_large.to_string().contains("100"));
        assert!(too_large.to_string().contains("10"));
    }

    #[test]
    fn only_storage_unavailable_is_retryable() {
        assert!(ArcanumError::StorageUnavailable("busy".into()).is_retryable());
        assert!(!ArcanumError::HandleClosed.is_retryable());
        assert!(!ArcanumError::NotFound("x".into()).is_retryable());
        assert!(!ArcanumError::Crypto("bad".into()).is_retryable());
    }

    #[test]
    fn value_not_set_names_the_uuid() {
        let uuid = SecretUuid::generate();
        let err = ArcanumError::ValueNotSet(uuid);
        assert!(err.to_string().contains(&uuid.to_string()));
    }
}
