// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the earshot daemon.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level earshot configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EarshotConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// WebSocket gateway listener settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Ingestion filter settings.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Operator (admin) channel settings.
    #[serde(default)]
    pub admin: AdminConfig,

    /// Chat-completion model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Analysis batcher settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// WebSocket gateway listener configuration.
///
/// The message gateway reverse-connects to this address; earshot is the
/// server side of the socket.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret for the connection handshake. `None` disables auth.
    #[serde(default)]
    pub secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            secret: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

/// Ingestion filter configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Group conversation ids to listen to. Fixed at startup; messages from
    /// any other group are ignored.
    #[serde(default)]
    pub listen_group_ids: Vec<i64>,
}

/// Operator channel configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    /// The single privileged operator account id. `None` disables the
    /// command channel entirely.
    #[serde(default)]
    pub operator_id: Option<i64>,
}

/// Chat-completion model configuration (OpenAI-compatible endpoint).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Base URL of the chat-completion API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// API key. `None` turns analysis into a warn-once no-op; ingestion and
    /// storage keep working.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier sent with every request.
    #[serde(default = "default_model_name")]
    pub name: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            name: default_model_name(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model_name() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_timeout_secs() -> u64 {
    30
}

/// Analysis batcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Minutes between scheduled batcher passes.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,

    /// Hard cap on unprocessed messages fetched per pass.
    #[serde(default = "default_max_messages")]
    pub max_messages_per_analysis: usize,

    /// Character count above which a message takes the priority lane.
    #[serde(default = "default_long_message_threshold")]
    pub long_message_threshold: usize,

    /// Bulk-lane chunk size.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Recent-history messages fetched per conversation as prompt context.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            max_messages_per_analysis: default_max_messages(),
            long_message_threshold: default_long_message_threshold(),
            batch_size: default_batch_size(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_interval_minutes() -> u32 {
    30
}

fn default_max_messages() -> usize {
    50
}

fn default_long_message_threshold() -> usize {
    50
}

fn default_batch_size() -> usize {
    10
}

fn default_history_limit() -> usize {
    20
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("earshot").join("earshot.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "earshot.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}
