// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses, non-empty paths, and sane
//! batcher parameters.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::EarshotConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &EarshotConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate gateway.host is not empty and looks like an IP or hostname.
    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    // An empty secret would accept any bearer value that is also empty;
    // require it to be set meaningfully or not at all.
    if let Some(secret) = &config.gateway.secret
        && secret.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "gateway.secret must not be blank; omit it to disable auth".to_string(),
        });
    }

    // Validate database_path is not empty.
    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // Validate batcher parameters.
    let analysis = &config.analysis;
    if analysis.interval_minutes < 1 || analysis.interval_minutes > 1440 {
        errors.push(ConfigError::Validation {
            message: format!(
                "analysis.interval_minutes must be between 1 and 1440, got {}",
                analysis.interval_minutes
            ),
        });
    }
    if analysis.max_messages_per_analysis == 0 {
        errors.push(ConfigError::Validation {
            message: "analysis.max_messages_per_analysis must be at least 1".to_string(),
        });
    }
    if analysis.batch_size == 0 {
        errors.push(ConfigError::Validation {
            message: "analysis.batch_size must be at least 1".to_string(),
        });
    }

    // Validate model sampling parameters.
    if !(0.0..=2.0).contains(&config.model.temperature) {
        errors.push(ConfigError::Validation {
            message: format!(
                "model.temperature must be between 0.0 and 2.0, got {}",
                config.model.temperature
            ),
        });
    }
    if config.model.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "model.timeout_secs must be at least 1".to_string(),
        });
    }

    // Validate no duplicate group ids in the allow-list.
    let mut seen = HashSet::new();
    for id in &config.ingest.listen_group_ids {
        if !seen.insert(id) {
            errors.push(ConfigError::Validation {
                message: format!("duplicate group id `{id}` in ingest.listen_group_ids"),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
