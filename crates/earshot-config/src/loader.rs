// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./earshot.toml` > `~/.config/earshot/earshot.toml`
//! > `/etc/earshot/earshot.toml` with environment variable overrides via the
//! `EARSHOT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::EarshotConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/earshot/earshot.toml` (system-wide)
/// 3. `~/.config/earshot/earshot.toml` (user XDG config)
/// 4. `./earshot.toml` (local directory)
/// 5. `EARSHOT_*` environment variables
pub fn load_config() -> Result<EarshotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EarshotConfig::default()))
        .merge(Toml::file("/etc/earshot/earshot.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("earshot/earshot.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("earshot.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<EarshotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EarshotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<EarshotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EarshotConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// CRITICAL: Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. `EARSHOT_ANALYSIS_BATCH_SIZE` must map to
/// `analysis.batch_size`, not `analysis.batch.size`.
fn env_provider() -> Env {
    Env::prefixed("EARSHOT_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: EARSHOT_GATEWAY_SECRET -> "gateway_secret"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("log_", "log.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("ingest_", "ingest.", 1)
            .replacen("admin_", "admin.", 1)
            .replacen("model_", "model.", 1)
            .replacen("analysis_", "analysis.", 1)
            .replacen("storage_", "storage.", 1);
        mapped.into()
    })
}
