// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the earshot configuration system.

use earshot_config::diagnostic::{ConfigError, suggest_key};
use earshot_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_earshot_config() {
    let toml = r#"
[log]
level = "debug"

[gateway]
host = "0.0.0.0"
port = 8090
secret = "shared-secret"

[ingest]
listen_group_ids = [100001, 100002]

[admin]
operator_id = 900001

[model]
api_base = "https://llm.internal/v1"
api_key = "sk-test"
name = "gpt-4o-mini"
temperature = 0.2
max_tokens = 1500
timeout_secs = 20

[analysis]
interval_minutes = 15
max_messages_per_analysis = 40
long_message_threshold = 60
batch_size = 8
history_limit = 10

[storage]
database_path = "/tmp/earshot-test.db"
wal_mode = false
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.gateway.port, 8090);
    assert_eq!(config.gateway.secret.as_deref(), Some("shared-secret"));
    assert_eq!(config.ingest.listen_group_ids, vec![100001, 100002]);
    assert_eq!(config.admin.operator_id, Some(900001));
    assert_eq!(config.model.api_base, "https://llm.internal/v1");
    assert_eq!(config.analysis.interval_minutes, 15);
    assert_eq!(config.analysis.long_message_threshold, 60);
    assert_eq!(config.storage.database_path, "/tmp/earshot-test.db");
    assert!(!config.storage.wal_mode);
}

/// Unknown field in a section produces an error mentioning the bad key.
#[test]
fn unknown_field_in_gateway_produces_error() {
    let toml = r#"
[gateway]
prot = 9000
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("prot"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Empty TOML uses compiled defaults throughout.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.log.level, "info");
    assert_eq!(config.gateway.host, "0.0.0.0");
    assert_eq!(config.gateway.port, 8081);
    assert!(config.gateway.secret.is_none());
    assert!(config.ingest.listen_group_ids.is_empty());
    assert!(config.admin.operator_id.is_none());
    assert!(config.model.api_key.is_none());
    assert_eq!(config.analysis.max_messages_per_analysis, 50);
    assert_eq!(config.analysis.batch_size, 10);
    assert!(config.storage.wal_mode);
}

/// The high-level entry point converts unknown keys into UnknownKey
/// diagnostics with a suggestion.
#[test]
fn load_and_validate_str_suggests_correction() {
    let toml = r#"
[analysis]
batch_sze = 5
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject typo");
    let unknown = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey { key, suggestion, .. } => Some((key, suggestion)),
            _ => None,
        })
        .expect("expected an UnknownKey diagnostic");
    assert_eq!(unknown.0, "batch_sze");
    assert_eq!(unknown.1.as_deref(), Some("batch_size"));
}

/// Validation errors surface through the high-level entry point.
#[test]
fn load_and_validate_str_runs_semantic_validation() {
    let toml = r#"
[analysis]
batch_size = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject zero batch size");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("batch_size"))
    ));
}

#[test]
fn suggest_key_works_on_analysis_section_keys() {
    let valid = &[
        "interval_minutes",
        "max_messages_per_analysis",
        "long_message_threshold",
        "batch_size",
        "history_limit",
    ];
    assert_eq!(
        suggest_key("histroy_limit", valid),
        Some("history_limit".to_string())
    );
}
