// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: recognized log levels and usage types, KDF parameter
//! minimums, non-empty paths, and a positive size ceiling.

use std::str::FromStr;

use arcanum_core::UsageType;

use crate::diagnostic::ConfigError;
use crate::model::ArcanumConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ArcanumConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "service.log_level `{}` is not one of: {}",
                config.service.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.service.max_sessions == 0 {
        errors.push(ConfigError::Validation {
            message: "service.max_sessions must be at least 1".to_string(),
        });
    }

    if config.store.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "store.database_path must not be empty".to_string(),
        });
    }

    if config.store.max_value_size == 0 {
        errors.push(ConfigError::Validation {
            message: "store.max_value_size must be at least 1 byte".to_string(),
        });
    }

    if config.store.kdf_memory_cost < 32768 {
        errors.push(ConfigError::Validation {
            message: format!(
                "store.kdf_memory_cost must be at least 32768 (32 MiB), got {}",
                config.store.kdf_memory_cost
            ),
        });
    }

    if config.store.kdf_iterations < 2 {
        errors.push(ConfigError::Validation {
            message: format!(
                "store.kdf_iterations must be at least 2, got {}",
                config.store.kdf_iterations
            ),
        });
    }

    if config.store.kdf_parallelism < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "store.kdf_parallelism must be at least 1, got {}",
                config.store.kdf_parallelism
            ),
        });
    }

    for entry in &config.access.granted_usage {
        if UsageType::from_str(entry).is_err() {
            errors.push(ConfigError::Validation {
                message: format!(
                    "access.granted_usage entry `{entry}` is not a recognized usage type \
                     (volume, ceph, iscsi, none)"
                ),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
