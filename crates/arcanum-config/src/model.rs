// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Arcanum secret service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Arcanum configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArcanumConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Value store settings: backend path, size ceiling, key derivation.
    #[serde(default)]
    pub store: StoreConfig,

    /// Default access grants for locally opened sessions.
    #[serde(default)]
    pub access: AccessConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Maximum number of concurrently open sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_service_name() -> String {
    "arcanum".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_sessions() -> usize {
    32
}

/// Value store configuration.
///
/// Covers the SQLite backend location, the size ceiling for persisted
/// values, and the Argon2id parameters protecting the store master key.
/// KDF defaults follow OWASP recommendations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// Size ceiling in bytes for persisted secret values.
    ///
    /// Ephemeral values are not subject to this ceiling; they never reach
    /// the backend.
    #[serde(default = "default_max_value_size")]
    pub max_value_size: usize,

    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB).
    #[serde(default = "default_kdf_memory_cost")]
    pub kdf_memory_cost: u32,

    /// Argon2id iteration count (default: 3).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2id parallelism lanes (default: 4).
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            max_value_size: default_max_value_size(),
            kdf_memory_cost: default_kdf_memory_cost(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("arcanum").join("arcanum.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("arcanum.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_max_value_size() -> usize {
    65536
}

fn default_kdf_memory_cost() -> u32 {
    65536 // 64 MiB per OWASP recommendation
}

fn default_kdf_iterations() -> u32 {
    3
}

fn default_kdf_parallelism() -> u32 {
    4
}

/// Default access grants for sessions opened by the local CLI.
///
/// Callers connecting through other frontends supply their own grants at
/// session open; this section only seeds local operator sessions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AccessConfig {
    /// Usage types the session may touch (`volume`, `ceph`, `iscsi`, `none`).
    #[serde(default = "default_granted_usage")]
    pub granted_usage: Vec<String>,

    /// Open sessions read-only: mutating operations are denied.
    #[serde(default)]
    pub read_only: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            granted_usage: default_granted_usage(),
            read_only: false,
        }
    }
}

fn default_granted_usage() -> Vec<String> {
    vec![
        "volume".to_string(),
        "ceph".to_string(),
        "iscsi".to_string(),
        "none".to_string(),
    ]
}
