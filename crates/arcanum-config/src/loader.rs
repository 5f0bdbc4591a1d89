// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./arcanum.toml` > `~/.config/arcanum/arcanum.toml`
//! > `/etc/arcanum/arcanum.toml` with environment variable overrides via
//! the `ARCANUM_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ArcanumConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/arcanum/arcanum.toml` (system-wide)
/// 3. `~/.config/arcanum/arcanum.toml` (user XDG config)
/// 4. `./arcanum.toml` (local directory)
/// 5. `ARCANUM_*` environment variables
pub fn load_config() -> Result<ArcanumConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit inline configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ArcanumConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ArcanumConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ArcanumConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ArcanumConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ArcanumConfig::default()))
        .merge(Toml::file("/etc/arcanum/arcanum.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("arcanum/arcanum.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("arcanum.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so key names that
/// themselves contain underscores stay intact: `ARCANUM_STORE_MAX_VALUE_SIZE`
/// must map to `store.max_value_size`, not `store.max.value.size`.
fn env_provider() -> Env {
    Env::prefixed("ARCANUM_").map(|key| {
        // `key` is the lowercased env var name with the prefix stripped.
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("store_", "store.", 1)
            .replacen("access_", "access.", 1);
        mapped.into()
    })
}
